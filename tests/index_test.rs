use tessera::{
    Database, DatabaseConfig, GraphStorage, IndexManager, Label, Node, PropertyValue,
};
use tempfile::TempDir;

fn seed_people(dir: &TempDir) -> Vec<Node> {
    let mut alice = Node::new("Person");
    alice.set_property("name", "Alice");
    let mut bob = Node::new("Person");
    bob.set_property("name", "Bob");
    let nodes = vec![alice, bob];
    GraphStorage::new(dir.path()).save_nodes(&nodes).unwrap();
    nodes
}

#[test]
fn test_index_correct_at_build_time() {
    let temp_dir = TempDir::new().unwrap();
    let nodes = seed_people(&temp_dir);
    let db = Database::open(temp_dir.path(), DatabaseConfig::default()).unwrap();

    db.create_index(&Label::new("Person"), "name").unwrap();

    let ids = db.find_nodes_with_index(&Label::new("Person"), "name", &"Alice".into());
    assert_eq!(ids, vec![nodes[0].id.clone()]);
    assert!(db
        .find_nodes_with_index(&Label::new("Person"), "age", &"Alice".into())
        .is_empty());
    assert!(db
        .find_nodes_with_index(&Label::new("City"), "name", &"Alice".into())
        .is_empty());
}

#[test]
fn test_create_index_query() {
    let temp_dir = TempDir::new().unwrap();
    seed_people(&temp_dir);
    let db = Database::open(temp_dir.path(), DatabaseConfig::default()).unwrap();

    let result = db.query("CREATE INDEX ON :Person(name)").unwrap();
    assert_eq!(result.message, "Index created for :Person on property 'name'");
    assert_eq!(
        db.list_indexes(),
        vec![(Label::new("Person"), "name".to_string())]
    );
}

#[test]
fn test_stale_index_falls_back_to_scan() {
    let temp_dir = TempDir::new().unwrap();
    seed_people(&temp_dir);
    let config = DatabaseConfig {
        maintain_indexes: false,
        ..DatabaseConfig::default()
    };
    let db = Database::open(temp_dir.path(), config).unwrap();
    db.create_index(&Label::new("Person"), "name").unwrap();

    db.query(r#"CREATE (c:Person {name: "Carol"})"#).unwrap();

    // The index never heard of Carol
    assert!(db
        .find_nodes_with_index(&Label::new("Person"), "name", &"Carol".into())
        .is_empty());

    // but the empty probe falls back to a full scan
    let result = db
        .execute(r#"MATCH (n:Person {name: "Carol"}) RETURN n"#, true)
        .unwrap();
    assert_eq!(result.nodes.len(), 1);
}

#[test]
fn test_indexes_maintained_on_create() {
    let temp_dir = TempDir::new().unwrap();
    seed_people(&temp_dir);
    let db = Database::open(temp_dir.path(), DatabaseConfig::default()).unwrap();
    db.create_index(&Label::new("Person"), "name").unwrap();

    let created = db.query(r#"CREATE (c:Person {name: "Carol"})"#).unwrap();
    let ids = db.find_nodes_with_index(&Label::new("Person"), "name", &"Carol".into());
    assert_eq!(ids, vec![created.nodes[0].id.clone()]);
}

#[test]
fn test_index_hits_are_verified() {
    let temp_dir = TempDir::new().unwrap();
    let nodes = seed_people(&temp_dir);
    IndexManager::new(temp_dir.path())
        .create_index(&Label::new("Person"), "name")
        .unwrap();

    // Rename Alice behind the index's back
    let mut renamed = nodes.clone();
    renamed[0].set_property("name", "Alicia");
    GraphStorage::new(temp_dir.path()).save_nodes(&renamed).unwrap();

    let db = Database::open(temp_dir.path(), DatabaseConfig::default()).unwrap();
    let result = db
        .execute(r#"MATCH (n:Person {name: "Alice"}) RETURN n"#, true)
        .unwrap();
    assert!(result.nodes.is_empty());
}

#[test]
fn test_index_and_scan_agree() {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path(), DatabaseConfig::default()).unwrap();
    for i in 0..20 {
        db.query(&format!("CREATE (n:Item {{sku: {}, group: {}}})", i, i % 3))
            .unwrap();
    }
    db.create_index(&Label::new("Item"), "group").unwrap();

    let indexed = db.execute("MATCH (n:Item {group: 1}) RETURN n", true).unwrap();
    let scanned = db.execute("MATCH (n:Item {group: 1}) RETURN n", false).unwrap();
    assert_eq!(indexed.nodes, scanned.nodes);
    assert_eq!(indexed.nodes.len(), 7);
    assert!(indexed
        .nodes
        .iter()
        .all(|n| n.get_property("group") == Some(&PropertyValue::Integer(1))));
}
