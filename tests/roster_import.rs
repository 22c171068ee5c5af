mod test_support;

use dtassess::db::{Entity, Filter, MemoryStore, Persistence};
use dtassess::import::{self, CSV_TEMPLATE};
use dtassess::models::ClassRecord;
use test_support::FailingStore;

#[test]
fn parse_skips_header_and_malformed_rows() {
    let csv = "Name,Email,Year Group,Class Name\n\
               Ada Lovelace,ada@school.org,Year 5,Oak\n\
               Grace Hopper,grace@school.org,Year 6,Cedar\n\
               JustAName";
    let rows = import::parse(csv);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].original_row, 2);
    assert_eq!(rows[1].original_row, 3);
    assert_eq!(rows[1].email, "grace@school.org");
    assert_eq!(import::parse_roster(csv).skipped, 1);
}

#[tokio::test]
async fn one_failing_row_does_not_stop_the_batch() {
    let store = FailingStore::new("Grace Hopper", "duplicate email");
    let rows = import::parse(
        "Name,Email\nAda Lovelace,ada@school.org\nGrace Hopper,grace@school.org",
    );

    let result = import::import(&store, &rows, &[]).await;
    assert_eq!(result.successful, 1);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors, vec!["Grace Hopper: duplicate email".to_string()]);

    let pupils = store.list(Entity::Users, &[Filter::eq("role", "pupil")]).await.unwrap();
    assert_eq!(pupils.len(), 1);
    assert_eq!(pupils[0].str_field("name"), Some("Ada Lovelace"));
}

#[tokio::test]
async fn pupils_are_enrolled_in_matching_classes() {
    let store = MemoryStore::new();
    let willow = store
        .create(
            Entity::Classes,
            serde_json::json!({ "name": "Year 4 Willow", "year_group": "Year 4", "pupil_count": 0 }),
        )
        .await
        .unwrap();
    let classes: Vec<ClassRecord> = store
        .list(Entity::Classes, &[])
        .await
        .unwrap()
        .iter()
        .map(import::class_from_record)
        .collect();

    let rows = import::parse(
        "Name,Email,Year Group,Class Name\n\
         Leo Chen,leo@school.org,Year 4,willow\n\
         Mia Khan,mia@school.org,Year 4,\n\
         Noah Reid,noah@school.org,Year 2,Birch",
    );
    let result = import::import(&store, &rows, &classes).await;
    assert_eq!(result.successful, 3);
    assert!(result.errors.is_empty());

    let enrolled = store
        .list(Entity::ClassEnrollments, &[Filter::eq("class_id", willow.id.as_str())])
        .await
        .unwrap();
    assert_eq!(enrolled.len(), 2);

    let class = store.get(Entity::Classes, &willow.id).await.unwrap();
    assert_eq!(class.data["pupil_count"], 2);

    let noah = store
        .list(Entity::Users, &[Filter::eq("name", "Noah Reid")])
        .await
        .unwrap();
    assert!(noah[0].data["class_id"].is_null());
}

#[test]
fn template_documents_the_columns() {
    assert!(CSV_TEMPLATE.starts_with("Name,Email,Year Group,Class Name\n"));
    let example = CSV_TEMPLATE.lines().nth(1).unwrap();
    let email = example.split(',').nth(1).unwrap();
    assert!(email.contains('@') && email.contains('.'));
}
