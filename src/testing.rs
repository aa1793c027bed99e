#[cfg(test)]
pub mod fixtures {
    use std::{
        collections::HashMap,
        fmt,
        sync::{Arc, Mutex},
    };

    use tracing::{
        Event, Level, Subscriber,
        field::{Field, Visit},
    };
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use crate::{
        analyzer::AttributeSeq,
        expression::{AttributeReference, DataType, StructField, Value},
    };

    pub fn attr(name: &str, data_type: DataType, nullable: bool) -> AttributeReference {
        AttributeReference::new(name, data_type, nullable)
    }

    pub fn int_attr(name: &str) -> AttributeReference {
        attr(name, DataType::Int, true)
    }

    pub fn address_type() -> DataType {
        DataType::Struct(vec![
            StructField::new("city", DataType::String, false),
            StructField::new("zip", DataType::String, true),
        ])
    }

    /// `shop.people(id, full_name, age, vip, address)`
    pub fn people_schema() -> AttributeSeq {
        [
            attr("id", DataType::Int, false),
            attr("full_name", DataType::String, false),
            attr("age", DataType::Int, true),
            attr("vip", DataType::Boolean, false),
            attr("address", address_type(), true),
        ]
        .into_iter()
        .map(|a| a.with_qualifier(["shop", "people"]))
        .collect()
    }

    fn person(id: i32, full_name: &str, age: Option<i32>, vip: bool, city: &str) -> Vec<Value> {
        vec![
            Value::Int(id),
            Value::from(full_name),
            age.map(Value::Int).unwrap_or(Value::Null),
            Value::Boolean(vip),
            Value::Struct(vec![Value::from(city), Value::Null]),
        ]
    }

    pub fn people_rows() -> Vec<Vec<Value>> {
        vec![
            person(1, "Alice Johnson", Some(29), true, "Porto"),
            person(2, "Bruno Martins", Some(34), false, "Lisboa"),
            person(3, "Carla Sousa", None, false, "Braga"),
            person(4, "David Pereira", Some(25), true, "Coimbra"),
            person(14, "Nuno Teixeira", Some(32), true, "Évora"),
        ]
    }

    /// One `tracing` event seen by [`capture_events`].
    #[derive(Debug, Clone)]
    pub struct CapturedEvent {
        pub level: Level,
        pub fields: HashMap<String, String>,
    }

    impl CapturedEvent {
        pub fn field(&self, name: &str) -> Option<&str> {
            self.fields.get(name).map(String::as_str)
        }
    }

    #[derive(Clone, Default)]
    struct EventCapture {
        events: Arc<Mutex<Vec<CapturedEvent>>>,
    }

    #[derive(Default)]
    struct FieldCollector(HashMap<String, String>);

    impl Visit for FieldCollector {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.insert(field.name().to_string(), value.to_string());
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: Subscriber> Layer<S> for EventCapture {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = FieldCollector::default();
            event.record(&mut fields);
            let captured = CapturedEvent { level: *event.metadata().level(), fields: fields.0 };
            self.events.lock().unwrap().push(captured);
        }
    }

    /// Run `f` under a subscriber that records every event it emits on this thread.
    pub fn capture_events<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
        let capture = EventCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let result = tracing::subscriber::with_default(subscriber, f);
        let events = capture.events.lock().unwrap().clone();
        (result, events)
    }
}
