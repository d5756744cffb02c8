//! Property-based and concurrency tests for the document store.

use std::thread;

use proptest::prelude::*;
use serde_json::json;

use schemadoc_core::{DataType, Lens, LensOp, SchemaId};
use schemadoc_store::DocumentStore;

fn two_version_store() -> (DocumentStore, SchemaId, SchemaId) {
    let mut store = DocumentStore::new();
    store.create_lineage("Project").unwrap();
    let v1 = store
        .register_version(
            Lens::new(vec![
                LensOp::add("title", DataType::String),
                LensOp::add("summary", DataType::String),
            ]),
            "Project",
        )
        .unwrap();
    let v2 = store
        .register_version(Lens::new(vec![LensOp::rename("summary", "description")]), "Project")
        .unwrap();
    (store, v1, v2)
}

proptest! {
    #[test]
    fn read_after_write_reflects_the_mutation(
        title in "[a-zA-Z ]{0,16}",
        summary in "[a-zA-Z ]{0,16}",
    ) {
        let (store, v1, v2) = two_version_store();
        let mut doc = store.init_doc(&json!({"title": "seed"}), v1).unwrap();

        store
            .change_typed_doc(&mut doc, v2, |d| {
                d["title"] = json!(title.clone());
                d["description"] = json!(summary.clone());
            })
            .unwrap();

        prop_assert_eq!(
            store.read_as(&doc, v2).unwrap(),
            json!({"title": title.clone(), "description": summary.clone()})
        );
        prop_assert_eq!(
            store.read_as(&doc, v1).unwrap(),
            json!({"title": title, "summary": summary})
        );
    }
}

#[test]
fn parallel_reads_under_different_targets_agree_with_serial_reads() {
    let (store, v1, v2) = two_version_store();
    let mut doc = store
        .init_doc(&json!({"title": "t", "summary": "s"}), v1)
        .unwrap();
    for i in 0..20 {
        let writer = if i % 2 == 0 { v1 } else { v2 };
        let field = if writer == v1 { "summary" } else { "description" };
        store
            .change_typed_doc(&mut doc, writer, |d| d[field] = json!(format!("rev {i}")))
            .unwrap();
    }

    let serial_v1 = store.read_as(&doc, v1).unwrap();
    let serial_v2 = store.read_as(&doc, v2).unwrap();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let target = if i % 2 == 0 { v1 } else { v2 };
                let (store, doc) = (&store, &doc);
                scope.spawn(move || (target, store.read_as(doc, target).unwrap()))
            })
            .collect();
        for handle in handles {
            let (target, value) = handle.join().unwrap();
            let expected = if target == v1 { &serial_v1 } else { &serial_v2 };
            assert_eq!(&value, expected);
        }
    });

    assert_eq!(serial_v1["summary"], json!("rev 19"));
    assert_eq!(serial_v2["description"], json!("rev 19"));
}
