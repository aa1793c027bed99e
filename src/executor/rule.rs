use crate::analyzer::AnalyzerResult;

/// A named rewrite from tree to tree.
///
/// Returning an input that is structurally equal to what came in signals that
/// the rule did nothing on this invocation.
pub trait Rule<T>: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, plan: T) -> AnalyzerResult<T>;
}

type RuleFn<T> = dyn Fn(T) -> AnalyzerResult<T> + Send + Sync;

/// Adapter turning a closure into a [`Rule`].
pub struct FnRule<T> {
    name: String,
    f: Box<RuleFn<T>>,
}

impl<T> FnRule<T> {
    pub fn new(name: impl Into<String>, f: impl Fn(T) -> AnalyzerResult<T> + Send + Sync + 'static) -> Self {
        Self { name: name.into(), f: Box::new(f) }
    }

    pub fn boxed(
        name: impl Into<String>,
        f: impl Fn(T) -> AnalyzerResult<T> + Send + Sync + 'static,
    ) -> Box<dyn Rule<T>>
    where
        T: 'static,
    {
        Box::new(Self::new(name, f))
    }
}

impl<T> Rule<T> for FnRule<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, plan: T) -> AnalyzerResult<T> {
        (self.f)(plan)
    }
}
