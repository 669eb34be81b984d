//! Values as they appear in real dconf dumps.

use tinydconf_variant::{Tag, Variant, VariantNode, VariantType, View};

#[test]
fn gnome_style_settings_parse() {
    let cases = [
        ("'Adwaita'", "s"),
        ("true", "b"),
        ("uint32 300", "u"),
        ("1.25", "d"),
        ("['<Super>Left', '<Primary><Super>Left']", "as"),
        ("@as []", "as"),
        ("[('xkb', 'us'), ('xkb', 'de')]", "a(ss)"),
        ("{'show-hidden': <true>, 'sort': <'name'>}", "a{sv}"),
        ("@a{ss} {}", "a{ss}"),
        ("(1, 2)", "(ii)"),
        ("@mb nothing", "mb"),
    ];
    for (text, ty) in cases {
        let v = Variant::parse(text).unwrap_or_else(|e| panic!("{}: {}", text, e));
        assert_eq!(v.ty().as_str(), ty, "{}", text);
    }
}

#[test]
fn walk_nested_value() {
    let v = Variant::parse("[('xkb', 'us'), ('xkb', 'de')]").unwrap();
    assert_eq!(v.view(), View::Array);
    assert_eq!(VariantNode::n_children(&v), 2);

    let second = VariantNode::child_value(&v, 1).unwrap();
    assert_eq!(second.tag(), Tag::Tuple);
    let layout = second.child_value(1).unwrap();
    assert_eq!(layout.view(), View::String("de"));
    assert!(second.child_value(2).is_none());
}

#[test]
fn typed_parse_coerces_literals() {
    let ty = VariantType::new("(yqt)").unwrap();
    let v = Variant::parse_typed("(1, 2, 3)", &ty).unwrap();
    assert_eq!(v.child_value(0).unwrap().view(), View::Byte(1));
    assert_eq!(v.child_value(1).unwrap().view(), View::UInt16(2));
    assert_eq!(v.child_value(2).unwrap().view(), View::UInt64(3));

    assert!(Variant::parse_typed("(-1, 2, 3)", &ty).is_err());
}

#[test]
fn display_matches_dconf_dump_style() {
    let v: Variant = "{'a': <1>}".parse().unwrap();
    assert_eq!(v.to_string(), "{'a': <1>}");

    let v: Variant = "@a(ss) []".parse().unwrap();
    assert_eq!(v.to_string(), "@a(ss) []");

    let v: Variant = "'multi\\nline'".parse().unwrap();
    assert_eq!(v.to_string(), "'multi\\nline'");
}
