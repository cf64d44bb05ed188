use pretty_assertions::assert_eq;
use regice_clock::{
    ClockKind,
    ClockNode,
    ClockTree,
    Description,
    Divider,
    Error,
    FixedClock,
    Gate,
    Hooks,
    MemoryMap,
    Mux,
};

fn device() -> MemoryMap {
    MemoryMap::new()
        .with_field("TEST1.TESTA.A1", 1)
        .with_field("TEST1.TESTA.A2", 1)
        .with_field("TEST1.TESTA.A3", 3)
}

fn field(map: &MemoryMap, path: &str) -> regice_clock::FieldRef {
    map.get(path).unwrap().to_ref()
}

/// Two branches: `osc1 -> div1 -> gate1` and
/// `osc3 -> mux1 -> div2 -> gate2 -> div3`, the multiplexer selecting `osc3`.
fn setup(map: &MemoryMap) -> ClockTree {
    let mut tree = ClockTree::new();
    tree.register(FixedClock::new(1234.0).with_name("osc1"));
    tree.register(FixedClock::new(2345.0).with_name("osc2"));
    tree.register(FixedClock::new(5432.0).with_name("osc3"));
    tree.register(
        Mux::new()
            .with_name("mux1")
            .with_mux_field(field(map, "TEST1.TESTA.A3"))
            .with_input(0, "osc1")
            .with_input(1, "osc2")
            .with_input(2, "osc3")
            .with_input(3, "osc3"),
    );
    tree.register(Divider::new().with_name("div1").with_div(2).with_parent("osc1"));
    tree.register(Divider::new().with_name("div2").with_div(4).with_parent("mux1"));
    tree.register(
        Gate::new()
            .with_name("gate1")
            .with_parent("div1")
            .with_en_field(field(map, "TEST1.TESTA.A1")),
    );
    tree.register(
        Gate::new()
            .with_name("gate2")
            .with_parent("div2")
            .with_en_field(field(map, "TEST1.TESTA.A2")),
    );
    tree.register(Divider::new().with_name("div3").with_div(2).with_parent("gate2"));
    tree
}

#[test]
fn get() {
    let map = device();
    let tree = setup(&map);

    assert!(tree.get(None).unwrap().is_none());
    assert_eq!(tree.get("osc3").unwrap().unwrap().name(), Some("osc3"));
    assert_eq!(
        tree.get("unknown clock").unwrap_err(),
        Error::UnknownClock("unknown clock".into())
    );
}

#[test]
fn get_freq() {
    let map = device();
    let tree = setup(&map);

    assert_eq!(tree.get_freq("osc3").unwrap(), 5432.0);
    assert_eq!(tree.get_freq("mux1").unwrap(), 5432.0);
    assert_eq!(tree.get_freq("div2").unwrap(), 1358.0);
    assert_eq!(tree.get_freq("gate2").unwrap(), 1358.0);
    assert_eq!(tree.get_freq("div3").unwrap(), 679.0);
    assert_eq!(tree.get_freq("div1").unwrap(), 617.0);
    assert_eq!(tree.get_freq("gate1").unwrap(), 617.0);
    assert_eq!(tree.get_freq(None).unwrap(), 0.0);
    assert_eq!(
        tree.get_freq("unknown clock").unwrap_err(),
        Error::UnknownClock("unknown clock".into())
    );
}

#[test]
fn frequencies_follow_live_registers() {
    let map = device();
    let tree = setup(&map);

    map.write("TEST1.TESTA.A3", 1).unwrap();
    assert_eq!(tree.get_freq("div3").unwrap(), 2345.0 / 8.0);

    map.write("TEST1.TESTA.A3", 0).unwrap();
    assert_eq!(tree.get_freq("div3").unwrap(), 1234.0 / 8.0);
}

#[test]
fn is_gated() {
    let map = device();
    let tree = setup(&map);

    map.write("TEST1.TESTA.A2", 1).unwrap();
    assert!(!tree.is_gated("gate2").unwrap());
    assert!(!tree.is_gated("div3").unwrap());

    map.write("TEST1.TESTA.A2", 0).unwrap();
    assert!(tree.is_gated("gate2").unwrap());
    assert!(tree.is_gated("div3").unwrap());
    assert!(tree.is_gated(None).unwrap());

    // The other branch is not affected.
    assert!(!tree.is_gated("gate1").unwrap());
}

#[test]
fn build() {
    let map = device();
    let mut tree = setup(&map);
    assert!(tree.build());

    tree.register(Divider::new().with_name("div4"));
    assert!(!tree.build());

    tree.remove("div4");
    assert!(tree.build());
}

#[test]
fn get_parent() {
    let map = device();
    let tree = setup(&map);

    let div3 = tree.clock("div3").unwrap();
    let gate2 = div3.get_parent(&tree).unwrap().unwrap();
    let div2 = gate2.get_parent(&tree).unwrap().unwrap();
    let mux1 = div2.get_parent(&tree).unwrap().unwrap();
    let osc = mux1.get_parent(&tree).unwrap().unwrap();

    assert_eq!(gate2.name(), Some("gate2"));
    assert_eq!(div2.name(), Some("div2"));
    assert_eq!(mux1.name(), Some("mux1"));
    assert_eq!(osc.name(), Some("osc3"));
    assert!(osc.get_parent(&tree).unwrap().is_none());
}

#[test]
fn get_orphans() {
    let map = device();
    let tree = setup(&map);

    let orphans = tree.get_orphans();
    assert_eq!(orphans.len(), 3);
    assert!(orphans.contains("osc1"));
    assert!(orphans.contains("osc2"));
    assert!(orphans.contains("osc3"));
}

#[test]
fn get_children() {
    let map = device();
    let tree = setup(&map);

    let children = tree.get_children("gate2");
    assert_eq!(children.len(), 1);
    assert!(children.contains("div3"));

    let children = tree.get_children("div2");
    assert_eq!(children.len(), 1);
    assert!(children.contains("gate2"));

    let children = tree.get_children("osc1");
    assert_eq!(children.len(), 2);
    assert!(children.contains("div1"));
    assert!(children.contains("mux1"));

    assert!(tree.get_children("div3").is_empty());
}

#[test]
fn make_tree() {
    let map = device();
    let tree = setup(&map);

    let forest = tree.make_tree();
    assert!(forest.contains("osc1"));
    assert!(forest["osc1"].contains("div1"));
    assert!(forest["osc1"]["div1"].contains("gate1"));
    assert!(!forest["osc1"].contains("mux1"));
    assert!(!forest["osc2"].contains("mux1"));
    assert!(forest["osc3"].contains("mux1"));
    assert!(forest["osc3"]["mux1"]["div2"]["gate2"]["div3"].is_empty());

    assert_eq!(
        forest.render(),
        "osc1\n  div1\n    gate1\nosc2\nosc3\n  mux1\n    div2\n      gate2\n        div3\n"
    );

    map.write("TEST1.TESTA.A3", 1).unwrap();
    let forest = tree.make_tree();
    assert!(forest["osc2"].contains("mux1"));
    assert!(!forest["osc3"].contains("mux1"));
}

#[test]
fn snapshot_restores_device_between_cases() {
    let map = device();
    let tree = setup(&map);
    let snapshot = map.snapshot();

    map.write("TEST1.TESTA.A1", 0).unwrap();
    map.write("TEST1.TESTA.A3", 0).unwrap();
    assert!(tree.is_gated("gate1").unwrap());

    map.restore(&snapshot);
    assert!(!tree.is_gated("gate1").unwrap());
    assert_eq!(tree.get_freq("mux1").unwrap(), 5432.0);
}

#[test]
fn description_matches_built_tree() {
    let description = Description::from_toml(
        r#"
        [registers]
        "TEST1.TESTA.A1" = 1
        "TEST1.TESTA.A2" = 1
        "TEST1.TESTA.A3" = 3

        [[clock]]
        type = "fixed"
        name = "osc1"
        freq = 1234

        [[clock]]
        type = "fixed"
        name = "osc2"
        freq = 2345

        [[clock]]
        type = "fixed"
        name = "osc3"
        freq = 5432

        [[clock]]
        type = "mux"
        name = "mux1"
        mux_field = "TEST1.TESTA.A3"
        inputs = [
            { selector = 0, clock = "osc1" },
            { selector = 1, clock = "osc2" },
            { selector = 2, clock = "osc3" },
            { selector = 3, clock = "osc3" },
        ]

        [[clock]]
        type = "divider"
        name = "div1"
        parent = "osc1"
        div = 2

        [[clock]]
        type = "divider"
        name = "div2"
        parent = "mux1"
        div = 4

        [[clock]]
        type = "gate"
        name = "gate1"
        parent = "div1"
        en_field = "TEST1.TESTA.A1"

        [[clock]]
        type = "gate"
        name = "gate2"
        parent = "div2"
        en_field = "TEST1.TESTA.A2"

        [[clock]]
        type = "divider"
        name = "div3"
        parent = "gate2"
        div = 2
        "#,
    )
    .unwrap();

    let map = description.registers();
    let loaded = description.instantiate(&map, &Hooks::new()).unwrap();
    let built = setup(&map);
    assert!(loaded.build());

    for (name, clock) in built.iter() {
        assert_eq!(loaded.clock(name).unwrap().kind(), clock.kind());
        assert_eq!(
            loaded.get_freq(name).unwrap(),
            built.get_freq(name).unwrap(),
            "{name}"
        );
    }
    assert_eq!(loaded.make_tree(), built.make_tree());
    assert_eq!(loaded.clock("mux1").unwrap().kind(), ClockKind::Mux);
}
