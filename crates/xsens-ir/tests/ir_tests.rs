//! Tests for the design database and its JSON form

use serde_json::json;
use xsens_ir::*;

fn build_adder_top() -> Module {
    let mut m = Module::new(escape_id("top"));
    let a = m.add_input(escape_id("a"), 4);
    let b = m.add_input(escape_id("b"), 4);
    let y = m.add_output(escape_id("y"), 4);
    let t = m.add_wire(escape_id("t"), 4);

    let add = m.add_cell(escape_id("add0"), "$add");
    let (a_sig, b_sig, t_sig) = (m.wire_sig(a), m.wire_sig(b), m.wire_sig(t));
    let cell = m.cell_mut(add);
    cell.set_param("A_SIGNED", Const::from_bool(true));
    cell.set_param("B_SIGNED", Const::from_bool(true));
    cell.set_port("A", a_sig);
    cell.set_port("B", b_sig);
    cell.set_port("Y", t_sig);

    let mut rhs = m.wire_sig(t).extract(0, 2);
    rhs.append(&SigSpec::repeat(State::Sx, 2));
    m.connect(m.wire_sig(y), rhs);
    m
}

#[test]
fn test_design_json_round_trip() {
    let mut design = Design::new();
    design.add_module(build_adder_top()).unwrap();

    let json = serde_json::to_string_pretty(&design).unwrap();
    let loaded: Design = serde_json::from_str(&json).unwrap();

    let top = loaded.module("\\top").unwrap();
    let add = top.find_cell("\\add0").unwrap();
    assert!(top.cell(add).param_bool("A_SIGNED"));
    assert_eq!(top.ports().len(), 3);
    assert_eq!(top.connections().len(), 1);
    assert!(top.connections()[0].1.has_undef());

    // name indexes are rebuilt, so fresh wires get fresh ids
    let mut top = top.clone();
    let fresh = top.add_wire(escape_id("fresh"), 1);
    assert!(top.wire_ids().iter().filter(|id| **id == fresh).count() == 1);
}

fn adder_json() -> serde_json::Value {
    let mut design = Design::new();
    design.add_module(build_adder_top()).unwrap();
    serde_json::to_value(&design).unwrap()
}

#[test]
fn test_dangling_wire_reference_is_rejected() {
    let mut value = adder_json();
    value["modules"]["\\top"]["cells"][0]["connections"]["A"][0] =
        json!({"Wire": {"wire": 7, "offset": 0}});
    let err = serde_json::from_value::<Design>(value).unwrap_err();
    assert!(err.to_string().contains("missing bit 0 of wire w7"), "{}", err);

    // an offset past the wire width is just as dangling
    let mut value = adder_json();
    let a = value["modules"]["\\top"]["wires"][0]["id"].clone();
    value["modules"]["\\top"]["connections"][0][1][0] =
        json!({"Wire": {"wire": a, "offset": 4}});
    let err = serde_json::from_value::<Design>(value).unwrap_err();
    assert!(err.to_string().contains("connection 0"), "{}", err);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let mut value = adder_json();
    let wires = value["modules"]["\\top"]["wires"].as_array_mut().unwrap();
    let mut copy = wires[0].clone();
    copy["id"] = json!(99);
    wires.push(copy);
    let err = serde_json::from_value::<Design>(value).unwrap_err();
    assert!(err.to_string().contains("declares wire a twice"), "{}", err);

    let mut value = adder_json();
    let cells = value["modules"]["\\top"]["cells"].as_array_mut().unwrap();
    let mut copy = cells[0].clone();
    copy["id"] = json!(42);
    cells.push(copy);
    let err = serde_json::from_value::<Design>(value).unwrap_err();
    assert!(err.to_string().contains("cell"), "{}", err);
}

#[test]
fn test_connection_width_mismatch_is_rejected() {
    let mut value = adder_json();
    value["modules"]["\\top"]["connections"][0][1]
        .as_array_mut()
        .unwrap()
        .pop();
    let err = serde_json::from_value::<Design>(value).unwrap_err();
    assert!(err.to_string().contains("joins 4 bits to 3 bits"), "{}", err);
}

#[test]
fn test_const_serializes_msb_first() {
    let json = serde_json::to_string(&Const::from_int(6, 4)).unwrap();
    assert_eq!(json, "\"0110\"");
    let parsed: Const = serde_json::from_str("\"1x\"").unwrap();
    assert_eq!(parsed.bits(), &[State::Sx, State::S1]);
}

#[test]
fn test_sigmap_follows_connections() {
    let m = build_adder_top();
    let sigmap = SigMap::from_module(&m);
    let y = m.find_wire("\\y").unwrap();
    let t = m.find_wire("\\t").unwrap();

    let mapped = sigmap.map(&m.wire_sig(y));
    assert_eq!(mapped[0], SigBit::wire(t, 0));
    assert_eq!(mapped[1], SigBit::wire(t, 1));
    assert_eq!(mapped[2], SigBit::Const(State::Sx));
}
