//! Integration tests for sharing one catalog between translating threads

use super::load_sales_catalog;
use criteria_sql::config::TranslatorConfig;
use criteria_sql::{CriteriaTranslator, Criterion, QuerySpecification};

fn specs() -> Vec<QuerySpecification> {
    vec![
        QuerySpecification::new("Order")
            .join("items", "items")
            .add(Criterion::eq("status", "OPEN")),
        QuerySpecification::aliased("Order", "o").join("tags", "t"),
        QuerySpecification::new("Customer").add(Criterion::eq("address.city", "Oslo")),
        QuerySpecification::new("Employee"),
    ]
}

#[test]
fn test_concurrent_translations_match_sequential() {
    let catalog = load_sales_catalog();
    let specs = specs();

    let sequential: Vec<String> = specs
        .iter()
        .map(|spec| {
            CriteriaTranslator::new(&catalog, TranslatorConfig::default())
                .translate(spec)
                .unwrap()
                .sql
        })
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let catalog = &catalog;
                let specs = &specs;
                scope.spawn(move || {
                    let translator = CriteriaTranslator::new(catalog, TranslatorConfig::default());
                    // Each worker walks the specs from a different starting point
                    (0..specs.len())
                        .map(|i| {
                            let index = (i + worker) % specs.len();
                            let sql = translator.translate(&specs[index]).unwrap().sql;
                            (index, sql)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for handle in handles {
            for (index, sql) in handle.join().unwrap() {
                assert_eq!(sql, sequential[index]);
            }
        }
    });
}

#[test]
fn test_translator_reuse_does_not_leak_aliases() {
    let catalog = load_sales_catalog();
    let translator = CriteriaTranslator::new(&catalog, TranslatorConfig::default());
    let spec = QuerySpecification::new("Order").join("items", "i");

    let first = translator.translate(&spec).unwrap();
    let second = translator.translate(&spec).unwrap();
    assert_eq!(first.sql, second.sql);
    assert!(second.sql.contains(" order_items i1_ "));
}
