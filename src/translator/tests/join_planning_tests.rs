//! Declared, intermediate and implicit join planning.

use super::{join_count, translate, translate_with};
use crate::config::TranslatorConfig;
use crate::criteria::{Criterion, FetchMode, JoinKind, Order, Projection, QuerySpecification, SubNode};
use crate::result_projector::ResultMapping;
use std::collections::HashSet;

#[test]
fn test_declared_aliases_are_distinct_and_root_is_last() {
    let spec = QuerySpecification::new("Order")
        .join("items", "a")
        .join("a.product", "b");
    let query = translate(&spec).unwrap();

    assert_eq!(
        query.aliases(),
        ["a".to_string(), "b".to_string(), "order_".to_string()]
    );
    assert!(query.sql.contains(" inner join order_items a1_ on order_.order_id=a1_.order_id"));
    assert!(query.sql.contains(" inner join products b2_ on a1_.product_id=b2_.product_id"));

    assert_eq!(join_count(&query.sql), 2);

    let sql_aliases: HashSet<String> = match &query.result_mapping {
        ResultMapping::Entities { entities, .. } => {
            entities.iter().map(|e| e.sql_alias.clone()).collect()
        }
        other => panic!("unexpected mapping {:?}", other),
    };
    assert_eq!(sql_aliases.len(), spec.sub_nodes.len() + 1);
}

#[test]
fn test_multi_hop_path_gets_intermediate_join() {
    let spec = QuerySpecification::new("Order").join("items.product", "p");
    let query = translate(&spec).unwrap();

    assert_eq!(join_count(&query.sql), 2);
    assert!(query
        .sql
        .contains(" inner join order_items orderitem2_ on order_.order_id=orderitem2_.order_id"));
    assert!(query
        .sql
        .contains(" inner join products p1_ on orderitem2_.product_id=p1_.product_id"));
    assert_eq!(
        query.aliases(),
        ["orderitem2_".to_string(), "p".to_string(), "order_".to_string()]
    );
}

#[test]
fn test_many_to_many_joins_through_link_table() {
    let spec = QuerySpecification::new("Order").join("tags", "t");
    let query = translate(&spec).unwrap();
    assert!(query.sql.contains(
        " inner join order_tags order_tags2_ on order_.order_id=order_tags2_.order_id \
         inner join tags t1_ on order_tags2_.tag_id=t1_.tag_id"
    ));
    assert_eq!(query.aliases(), ["t".to_string(), "order_".to_string()]);
    assert!(query.query_spaces.contains("tags"));
}

#[test]
fn test_declared_join_kind_and_with_clause() {
    let mut items = SubNode::new("items", Some("i"), JoinKind::LeftOuter);
    items.with_clause = Some(Criterion::gt("quantity", 1));
    let spec = QuerySpecification::new("Order").join_with(items);
    let query = translate(&spec).unwrap();
    assert!(query.sql.contains(
        " left outer join order_items i1_ on order_.order_id=i1_.order_id and (i1_.quantity>?)"
    ));
}

#[test]
fn test_eager_to_one_joined_by_default() {
    let spec = QuerySpecification::new("Customer");
    let query = translate(&spec).unwrap();
    // Region is not lazy; orders is a collection and never fetched implicitly
    assert_eq!(join_count(&query.sql), 1);
    assert!(query
        .sql
        .contains(" left outer join regions region1_ on customer_.region_id=region1_.region_id"));
    assert_eq!(query.aliases(), ["region1_".to_string(), "customer_".to_string()]);
}

#[test]
fn test_implicit_joins_suppressed_under_projection() {
    let spec = QuerySpecification::new("Customer").project(Projection::property("name"));
    let query = translate(&spec).unwrap();
    assert_eq!(join_count(&query.sql), 0);
    assert_eq!(query.sql, "select customer_.name as y0_ from customers customer_");

    let profiled = QuerySpecification::new("Order")
        .enable_fetch_profile("order-with-customer")
        .project(Projection::RowCount);
    let query = translate(&profiled).unwrap();
    assert_eq!(join_count(&query.sql), 0);
}

#[test]
fn test_declared_joins_survive_projection() {
    let spec = QuerySpecification::new("Order")
        .join("customer", "c")
        .project(Projection::property("c.name"));
    let query = translate(&spec).unwrap();
    assert_eq!(join_count(&query.sql), 1);
    assert!(query.sql.starts_with("select c1_.name as y0_ from orders order_ inner join customers c1_"));
}

#[test]
fn test_implicit_depth_bound() {
    let spec = QuerySpecification::new("Employee");
    let query = translate(&spec).unwrap();
    assert_eq!(join_count(&query.sql), 3);
    assert!(query.sql.contains(
        " left outer join employees employee1_ on employee_.manager_id=employee1_.employee_id"
    ));
    assert!(query.sql.contains(
        " left outer join employees employee3_ on employee2_.manager_id=employee3_.employee_id"
    ));
    // Every hop of the self-reference reuses the same foreign key
    assert_eq!(query.duplicate_joins.len(), 2);

    let shallow = translate_with(
        &spec,
        TranslatorConfig {
            max_fetch_depth: 1,
            ..TranslatorConfig::default()
        },
    )
    .unwrap();
    assert_eq!(join_count(&shallow.sql), 1);

    let none = translate_with(
        &spec,
        TranslatorConfig {
            max_fetch_depth: 0,
            ..TranslatorConfig::default()
        },
    )
    .unwrap();
    assert_eq!(join_count(&none.sql), 0);
}

#[test]
fn test_fetch_profile_joins_to_one() {
    let spec = QuerySpecification::new("Order").enable_fetch_profile("order-with-customer");
    let query = translate(&spec).unwrap();
    // Required association off the root: inner join; Customer.region is eager below it
    assert!(query
        .sql
        .contains(" inner join customers customer1_ on order_.customer_id=customer1_.customer_id"));
    assert!(query
        .sql
        .contains(" left outer join regions region2_ on customer1_.region_id=region2_.region_id"));
    assert_eq!(join_count(&query.sql), 2);
}

#[test]
fn test_outer_fetch_profile_forces_left_join() {
    let spec = QuerySpecification::new("Order").enable_fetch_profile("order-with-customer-outer");
    let query = translate(&spec).unwrap();
    assert!(query.sql.contains(" left outer join customers customer1_ on "));
}

#[test]
fn test_fetch_profile_applies_to_subclass_root() {
    let spec = QuerySpecification::new("RushOrder").enable_fetch_profile("order-with-customer");
    let query = translate(&spec).unwrap();
    assert!(query.sql.contains(" inner join customers customer1_ on rushorder_.customer_id="));
}

#[test]
fn test_fetch_mode_overrides_profile_and_default() {
    let suppressed = QuerySpecification::new("Order")
        .enable_fetch_profile("order-with-customer")
        .fetch("customer", FetchMode::Select);
    assert_eq!(join_count(&translate(&suppressed).unwrap().sql), 0);

    let forced = QuerySpecification::new("Order").fetch("customer", FetchMode::Join);
    let query = translate(&forced).unwrap();
    assert!(query.sql.contains(" inner join customers customer1_ on "));

    let no_region = QuerySpecification::new("Customer").fetch("region", FetchMode::Select);
    assert_eq!(join_count(&translate(&no_region).unwrap().sql), 0);
}

#[test]
fn test_fetch_mode_join_on_collection() {
    let spec = QuerySpecification::new("Order").fetch("items", FetchMode::Join);
    let query = translate(&spec).unwrap();
    assert!(query
        .sql
        .contains(" left outer join order_items orderitem1_ on order_.order_id=orderitem1_.order_id"));
    assert!(query.sql.ends_with(" order by orderitem1_.line_no"));
}

#[test]
fn test_declared_collection_ordering_precedes_criteria_orderings() {
    let spec = QuerySpecification::new("Order")
        .join("items", "i")
        .order_by(Order::desc("placedOn"));
    let query = translate(&spec).unwrap();
    assert!(query.sql.ends_with(" order by i1_.line_no, order_.placed_on desc"));
}

#[test]
fn test_joined_association_restriction() {
    let spec = QuerySpecification::new("OrderItem")
        .join("product", "p")
        .add(Criterion::eq("p.sku", "A-1"))
        .add(Criterion::eq("order.id", 42));
    let query = translate(&spec).unwrap();
    assert!(query
        .sql
        .ends_with(" where p1_.sku=? and orderitem_.order_id=?"));
    assert_eq!(query.parameters.len(), 2);
}
