use rtspectral::harness::RtHarness;
use rtspectral::{Message, ProcessorConfig, ProcessorFactory, Scalar, ScalarOutlet, Symbol};

#[derive(Default)]
struct Outlet(Vec<String>);

impl ScalarOutlet for Outlet {
    fn emit_int(&mut self, value: i64) {
        self.0.push(format!("int {}", value));
    }
    fn emit_float(&mut self, value: f64) {
        self.0.push(format!("float {}", value));
    }
    fn emit_symbol(&mut self, value: &Symbol) {
        self.0.push(format!("symbol {}", value));
    }
}

fn harness(emit_on_update: bool) -> RtHarness {
    let factory = ProcessorFactory::default();
    let config = ProcessorConfig::default().with_emit_on_update(emit_on_update);
    RtHarness::new(&factory, config).unwrap()
}

#[test]
fn bang_reemits_with_type_tag() {
    let mut h = harness(false);
    assert!(h.processor.handle_message(Message::Bang).is_none());

    assert!(h.processor.handle_message(Message::Float(0.5)).is_none());
    let (mut left, mut right) = (Outlet::default(), Outlet::default());
    h.processor
        .handle_message(Message::Bang)
        .unwrap()
        .deliver(&mut left, &mut right);
    assert_eq!(left.0, vec!["float 0.5"]);
    assert_eq!(right.0, vec!["float 0.5"]);

    h.processor.handle_message(Message::Symbol(Symbol::new("peak")));
    let out = h.processor.handle_message(Message::Bang).unwrap();
    assert_eq!(out.left, Scalar::Symbolic(Symbol::new("peak")));
    assert_eq!(out.right, out.left);
}

#[test]
fn updates_emit_immediately_when_enabled() {
    let mut h = harness(true);
    let out = h.processor.handle_message(Message::Int(-3)).unwrap();
    assert_eq!(out.left, Scalar::Integer(-3));
    // Symbols are stored silently either way.
    assert!(h
        .processor
        .handle_message(Message::Symbol(Symbol::from("x")))
        .is_none());
}

#[test]
fn analyze_message_does_not_touch_scalar() {
    let mut h = harness(false);
    h.processor.handle_message(Message::Int(7));
    assert!(h.processor.handle_message(Message::Analyze).is_none());
    assert!(h.processor.analysis_pending());
    assert_eq!(h.processor.state().last_value, Some(Scalar::Integer(7)));
}
