use opac_core::{AttrValue, Attributes, ExemplarRow, ItemRecord};
use pretty_assertions::assert_eq;

#[test]
fn labels_and_values_are_trimmed() {
    let attributes = Attributes::new().merge("  Titel: ", "  Die Dinosaurier \n");
    assert_eq!(attributes.get("Titel"), Some(&["Die Dinosaurier".to_string()][..]));
}

#[test]
fn empty_values_are_ignored() {
    let attributes = Attributes::new().merge("Titel", "   ").merge("", "value");
    assert!(attributes.is_empty());
}

#[test]
fn merge_is_idempotent() {
    let once = Attributes::new().merge("Verfasser", "Meier");
    let twice = once.clone().merge("Verfasser:", " Meier ");
    assert_eq!(once, twice);
}

#[test]
fn distinct_values_keep_first_seen_order() {
    let attributes = Attributes::new()
        .merge("Schlagwort", "Dinosaurier")
        .merge("Titel", "Urzeit")
        .merge("Schlagwort", "Paläontologie")
        .merge("Schlagwort", "Dinosaurier")
        .merge("Schlagwort", "Fossil");

    let finished = attributes.finish();
    assert_eq!(
        finished,
        vec![
            (
                "Schlagwort".to_string(),
                AttrValue::List(vec![
                    "Dinosaurier".into(),
                    "Paläontologie".into(),
                    "Fossil".into()
                ])
            ),
            ("Titel".to_string(), AttrValue::Scalar("Urzeit".into())),
        ]
    );
}

#[test]
fn insert_reports_changes() {
    let mut attributes = Attributes::new();
    assert!(attributes.insert("ISBN", "978-3"));
    assert!(!attributes.insert("ISBN:", "978-3"));
    assert!(attributes.insert("ISBN", "978-4"));
    assert_eq!(attributes.len(), 1);
}

#[test]
fn finished_record_has_no_empty_values() {
    let attributes = Attributes::new()
        .merge("A", "")
        .merge("B", "x")
        .merge("B", "  ")
        .merge("C", "y");
    let record = ItemRecord::new(attributes, Vec::new());

    assert_eq!(record.attributes().len(), 2);
    for (_, value) in record.attributes() {
        assert!(!value.values().is_empty());
        assert!(value.values().iter().all(|v| !v.is_empty()));
    }
}

#[test]
fn exemplar_rows_drop_blank_cells_and_rows() {
    let columns = vec!["Standort".to_string(), "Status".to_string()];

    let row = ExemplarRow::from_cells(
        &columns,
        [Some("Shelf A".to_string()), Some("available".to_string())],
    )
    .unwrap();
    assert_eq!(row.get("Standort"), Some("Shelf A"));
    assert_eq!(row.get("Status"), Some("available"));

    let partial = ExemplarRow::from_cells(&columns, [None, Some(" lent ".to_string())]).unwrap();
    assert_eq!(partial.cells(), &[("Status".to_string(), "lent".to_string())]);

    assert_eq!(
        ExemplarRow::from_cells(&columns, [Some("  ".to_string()), None]),
        None
    );
}

#[test]
fn record_serializes_as_flat_map() {
    let columns = vec!["Standort".to_string(), "Status".to_string()];
    let row = ExemplarRow::from_cells(
        &columns,
        [Some("Shelf A".to_string()), Some("available".to_string())],
    )
    .unwrap();
    let attributes = Attributes::new()
        .merge("Medientyp", "Buch")
        .merge("Schlagwort", "a")
        .merge("Schlagwort", "b");
    let record = ItemRecord::new(attributes, vec![row]);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Medientyp": "Buch",
            "Schlagwort": ["a", "b"],
            "Exemplare": [{"Standort": "Shelf A", "Status": "available"}],
        })
    );
    assert_eq!(record.media_type(), Some("Buch"));
}
