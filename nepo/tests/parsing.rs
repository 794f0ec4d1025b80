use std::rc::Rc;

use nepo::block::find_start_block;
use nepo::config::{
    DriveRole, MotorPort, SensorKind, SensorPort, parse_configuration,
};
use nepo::parser::{MAX_SOURCE_BYTES, Parser};
use nepo::text::TextView;

fn parse(source: &str) -> nepo::ProgramTree {
    Parser::new(source.to_string(), 0).parse().expect("parse failed")
}

// ---------------------------------------------------------------------------
// TextView
// ---------------------------------------------------------------------------

#[test]
fn text_view_subview_laws() {
    let v = TextView::new(Rc::from("hello world"));
    assert_eq!(v.len(), 11);
    for (a, b) in [(0, 0), (0, 5), (3, 8), (6, 11), (11, 11)] {
        let sub = v.slice(a, b).expect("valid bounds");
        assert_eq!(sub.len(), b - a);
        for i in 0..sub.len() {
            assert_eq!(sub.byte_at(i), v.byte_at(a + i));
        }
    }
}

#[test]
fn text_view_invalid_bounds() {
    let v = TextView::new(Rc::from("abc"));
    assert!(v.slice(2, 1).is_none());
    assert!(v.slice(0, 4).is_none());
    assert_eq!(v.byte_at(3), None);
    assert_eq!(v.byte_at(2), Some(b'c'));
}

#[test]
fn text_view_search() {
    let v = TextView::new(Rc::from("<block type=\"text\">"));
    assert_eq!(v.find_byte(b'<', 0), Some(0));
    assert_eq!(v.find_byte(b'"', 0), Some(12));
    assert_eq!(v.find_byte(b'"', 13), Some(17));
    assert_eq!(v.find_byte(b'x', 0), None);
    assert_eq!(v.find_str("type", 0), Some(7));
    assert_eq!(v.find_str("type", 8), None);
}

#[test]
fn text_view_trim_and_equality() {
    let v = TextView::new(Rc::from("  42 \n"));
    assert_eq!(v.trim().as_str(), "42");
    // Content equality across different buffers and offsets.
    let other = TextView::new(Rc::from("x42y")).slice(1, 3).unwrap();
    assert_eq!(v.trim(), other);
    assert!(v.trim().starts_with("4"));
}

// ---------------------------------------------------------------------------
// Element scan
// ---------------------------------------------------------------------------

#[test]
fn nested_same_name_child() {
    let tree = parse("<x><x/></x>");
    assert_eq!(tree.root.tag_name(), "x");
    assert_eq!(tree.root.whole().as_str(), "<x><x/></x>");
    assert_eq!(tree.root.inner().as_str(), "<x/>");
    let children = tree.root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag_name(), "x");
}

#[test]
fn two_children_in_order() {
    let tree = parse("<x><y/><y/></x>");
    let children = tree.root.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].tag_name(), "y");
    assert_eq!(children[1].tag_name(), "y");
}

#[test]
fn deep_same_name_nesting() {
    let tree = parse("<x><x><x/></x></x>");
    let level1 = tree.root.children();
    assert_eq!(level1.len(), 1);
    let level2 = level1[0].children();
    assert_eq!(level2.len(), 1);
    assert!(level2[0].children().is_empty());
}

#[test]
fn similar_tag_prefix_does_not_nest() {
    // <blocks> must not count as a nested <block>.
    let tree = parse("<block><blocks/></block>");
    let children = tree.root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag_name(), "blocks");
}

#[test]
fn attributes_materialize() {
    let tree = parse("<block type=\"robControls_start\" id=\"1\"/>");
    assert_eq!(
        tree.root.attribute("type").map(|v| v.as_str()),
        Some("robControls_start")
    );
    assert_eq!(tree.root.attribute("id").map(|v| v.as_str()), Some("1"));
    assert_eq!(tree.root.attribute("missing"), None);
}

#[test]
fn repeated_materialization_is_stable() {
    let tree = parse("<a one=\"1\" two=\"2\"><b/><c/></a>");
    let first: Vec<_> = tree.root.attributes().to_vec();
    let second: Vec<_> = tree.root.attributes().to_vec();
    assert_eq!(first, second);

    let names1: Vec<_> = tree.root.children().iter().map(|c| c.tag_name()).collect();
    let names2: Vec<_> = tree.root.children().iter().map(|c| c.tag_name()).collect();
    assert_eq!(names1, names2);
    assert_eq!(names1, vec!["b", "c"]);
}

#[test]
fn text_content_is_trimmed() {
    let tree = parse("<field name=\"NUM\"> 42 </field>");
    assert_eq!(tree.root.text(), Some("42"));
}

#[test]
fn element_with_children_has_no_text() {
    let tree = parse("<a>text<b/></a>");
    assert_eq!(tree.root.text(), None);
    assert_eq!(tree.root.children().len(), 1);
}

#[test]
fn self_closing_has_empty_text() {
    let tree = parse("<a/>");
    assert_eq!(tree.root.text(), Some(""));
    assert!(tree.root.children().is_empty());
}

#[test]
fn unclosed_child_degrades() {
    let tree = parse("<a><b></a>");
    assert_eq!(tree.root.tag_name(), "a");
    let children = tree.root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag_name(), "b");
    assert!(children[0].children().is_empty());
}

#[test]
fn stray_closing_tag_is_skipped() {
    let tree = parse("<a></b><c/></a>");
    let children = tree.root.children();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].tag_name(), "c");
}

#[test]
fn declaration_and_comment_are_stripped() {
    let tree = parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- exported -->\n<a/>");
    assert_eq!(tree.root.tag_name(), "a");
}

#[test]
fn empty_source_is_an_error() {
    assert!(Parser::new(String::new(), 0).parse().is_err());
    assert!(Parser::new("   \n".to_string(), 0).parse().is_err());
    assert!(Parser::new("<a".to_string(), 0).parse().is_err());
}

#[test]
fn oversized_source_is_an_error() {
    let source = "x".repeat(MAX_SOURCE_BYTES + 1);
    let err = Parser::new(source, 0).parse().expect_err("should reject");
    assert!(err.message.contains("ceiling"), "message: {}", err.message);
}

// ---------------------------------------------------------------------------
// Block accessors and entry discovery
// ---------------------------------------------------------------------------

const PROGRAM: &str = r#"
<export>
  <block_set robottype="nxt">
    <instance x="13" y="13">
      <block type="robControls_start" id="1">
        <statement name="ST">
          <block type="robActions_display_text" id="2">
            <value name="OUT">
              <block type="text" id="3">
                <field name="TEXT">Hello Test!</field>
              </block>
            </value>
            <next>
              <block type="robActions_display_clear" id="4"/>
            </next>
          </block>
        </statement>
      </block>
    </instance>
  </block_set>
</export>
"#;

#[test]
fn block_slots_resolve() {
    let tree = parse(PROGRAM);
    let (start, extras) = find_start_block(&tree).expect("start block");
    assert_eq!(extras, 0);
    assert_eq!(start.block_type(), "robControls_start");

    let first = start.statement("ST").expect("ST statement");
    assert_eq!(first.block_type(), "robActions_display_text");
    assert!(start.statement("ELSE").is_none());

    let out = first.value("OUT").expect("OUT value");
    assert_eq!(out.block_type(), "text");
    assert_eq!(out.field("TEXT"), Some("Hello Test!"));
    assert_eq!(out.field("NUM"), None);

    let second = first.next().expect("next block");
    assert_eq!(second.block_type(), "robActions_display_clear");
    assert!(second.next().is_none());
}

#[test]
fn missing_start_block_is_reported() {
    let tree = parse("<block_set><instance><block type=\"text\"/></instance></block_set>");
    assert!(find_start_block(&tree).is_err());
}

#[test]
fn duplicate_start_blocks_are_counted() {
    let tree = parse(concat!(
        "<block_set>",
        "<instance><block type=\"robControls_start\" id=\"1\"/></instance>",
        "<instance><block type=\"robControls_start\" id=\"2\"/></instance>",
        "</block_set>"
    ));
    let (start, extras) = find_start_block(&tree).expect("start block");
    assert_eq!(extras, 1);
    assert_eq!(
        start.element().attribute("id").map(|v| v.as_str()),
        Some("1")
    );
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const CONFIG: &str = r#"
<config>
  <block_set robottype="nxt">
    <instance x="13" y="13">
      <block type="robBrick_NXT-Brick" id="1">
        <field name="WHEEL_DIAMETER">3,0</field>
        <field name="TRACK_WIDTH">10</field>
        <value name="MB">
          <block type="robBrick_motor_big" id="2">
            <field name="MOTOR_REGULATION">TRUE</field>
            <field name="MOTOR_REVERSE">ON</field>
            <field name="MOTOR_DRIVE">RIGHT</field>
          </block>
        </value>
        <value name="S1">
          <block type="robBrick_touch" id="3"/>
        </value>
        <value name="S4">
          <block type="robBrick_ultrasonic" id="4"/>
        </value>
      </block>
    </instance>
  </block_set>
</config>
"#;

#[test]
fn configuration_parses() {
    let robot = parse_configuration(&parse(CONFIG)).expect("config");
    assert_eq!(robot.wheel_diameter, 3.0);
    assert_eq!(robot.track_width, 10.0);

    let motor = robot.motor(MotorPort::B).expect("motor B");
    assert!(motor.regulation);
    assert!(motor.reverse);
    assert_eq!(motor.role, DriveRole::Right);
    assert!(robot.motor(MotorPort::A).is_none());

    assert_eq!(
        robot.sensor(SensorPort::S1).map(|s| s.kind),
        Some(SensorKind::Touch)
    );
    assert_eq!(
        robot.sensor(SensorPort::S4).map(|s| s.kind),
        Some(SensorKind::Ultrasonic)
    );
    assert!(robot.sensor(SensorPort::S2).is_none());
}

#[test]
fn default_configuration_is_fixed() {
    let robot = nepo::config::RobotConfiguration::default();
    assert_eq!(robot.motors.len(), 2);
    assert_eq!(robot.sensors.len(), 2);
    assert_eq!(robot.wheel_diameter, 5.6);
    assert_eq!(robot.track_width, 12.0);
    assert_eq!(
        robot.motor(MotorPort::B).map(|m| m.role),
        Some(DriveRole::Left)
    );
    assert_eq!(
        robot.motor(MotorPort::C).map(|m| m.role),
        Some(DriveRole::Right)
    );
    assert_eq!(
        robot.sensor(SensorPort::S1).map(|s| s.kind),
        Some(SensorKind::Touch)
    );
    assert_eq!(
        robot.sensor(SensorPort::S4).map(|s| s.kind),
        Some(SensorKind::Ultrasonic)
    );
}

#[test]
fn malformed_config_fragments_are_skipped() {
    let source = r#"
<config>
  <block_set>
    <instance>
      <block type="robBrick_NXT-Brick" id="1">
        <field name="WHEEL_DIAMETER">not-a-number</field>
        <value name="M9">
          <block type="robBrick_motor_big" id="2"/>
        </value>
        <value name="S2">
          <block type="robBrick_gyro" id="3"/>
        </value>
        <value name="S3"></value>
      </block>
    </instance>
  </block_set>
</config>
"#;
    let robot = parse_configuration(&parse(source)).expect("config");
    // Bad numeric keeps the default; bad port slot and empty slot are skipped.
    assert_eq!(robot.wheel_diameter, nepo::config::DEFAULT_WHEEL_DIAMETER);
    assert!(robot.motors.is_empty());
    assert_eq!(
        robot.sensor(SensorPort::S2).map(|s| s.kind),
        Some(SensorKind::Gyro)
    );
    assert!(robot.sensor(SensorPort::S3).is_none());
}

#[test]
fn config_requires_config_root() {
    let err = parse_configuration(&parse("<block_set><instance/></block_set>"))
        .expect_err("should reject");
    assert!(err.to_string().contains("config"));
}

#[test]
fn config_requires_brick_block() {
    let err = parse_configuration(&parse("<config><block_set/></config>"))
        .expect_err("should reject");
    assert!(err.to_string().contains("brick"));
}

#[test]
fn unknown_sensor_type_maps_to_unknown() {
    assert_eq!(SensorKind::from_type("robBrick_compass"), SensorKind::Unknown);
    assert_eq!(SensorKind::from_type("robBrick_colour"), SensorKind::Color);
}
