//! Integration tests for the full query pipeline.
//!
//! These tests run descriptors against the in-memory engine:
//! - Dynamic predicate composition
//! - Joins (inner, left, theta)
//! - Subqueries in filters and select lists
//! - Aggregates, case chains, scalar functions
//! - Ordering, null placement, and paging
//! - Projections and bulk mutations

use pretty_assertions::assert_eq;
use quill_query::expr::{Case, Expr, val};
use quill_query::{
    ColumnType, DeleteBuilder, Engine, ErrorCode, FromValue, FromValues, Mapper, NamedTarget,
    Pagination, Predicate, QueryBuilder, QueryResult, Schema, TableSchema, UpdateBuilder, Value,
};

fn schema() -> Schema {
    let mut schema = Schema::new();
    schema.register(
        TableSchema::new("team")
            .column("id", ColumnType::Int)
            .column("name", ColumnType::Text),
    );
    schema.register(
        TableSchema::new("member")
            .column("id", ColumnType::Int)
            .column("username", ColumnType::Text)
            .column("age", ColumnType::Int)
            .column("team_id", ColumnType::Int),
    );
    schema
}

/// Two teams, four members: member1/member2 in teamA, member3/member4 in
/// teamB, ages 10 through 40.
fn engine() -> (Engine, Schema) {
    let schema = schema();
    let mut engine = Engine::new(schema.clone());
    engine.insert("team", vec![1.into(), "teamA".into()]).unwrap();
    engine.insert("team", vec![2.into(), "teamB".into()]).unwrap();
    engine
        .insert("member", vec![1.into(), "member1".into(), 10.into(), 1.into()])
        .unwrap();
    engine
        .insert("member", vec![2.into(), "member2".into(), 20.into(), 1.into()])
        .unwrap();
    engine
        .insert("member", vec![3.into(), "member3".into(), 30.into(), 2.into()])
        .unwrap();
    engine
        .insert("member", vec![4.into(), "member4".into(), 40.into(), 2.into()])
        .unwrap();
    (engine, schema)
}

fn usernames(rows: &[quill_query::Row]) -> Vec<String> {
    rows.iter()
        .map(|r| r.get_string("username").unwrap())
        .collect()
}

#[test]
fn test_filter_by_username_and_age() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let q = QueryBuilder::select_from(&member)
        .filter(member.col("username").unwrap().eq("member1"))
        .filter(member.col("age").unwrap().eq(10))
        .build()
        .unwrap();
    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_str("username").unwrap(), "member1");
}

#[test]
fn test_dynamic_filter_subsets() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let search = |username: Option<&str>, age: Option<i64>| -> QueryResult<usize> {
        let q = QueryBuilder::select_from(&member)
            .filter_all([
                username.map(|u| member.col("username").unwrap().eq(u)),
                age.map(|a| member.col("age").unwrap().eq(a)),
            ])
            .build()?;
        engine.count(&q)
    };

    assert_eq!(search(Some("member1"), Some(10)).unwrap(), 1);
    assert_eq!(search(Some("member1"), None).unwrap(), 1);
    assert_eq!(search(None, Some(40)).unwrap(), 1);
    // Every condition absent: nothing is filtered.
    assert_eq!(search(None, None).unwrap(), 4);
}

#[test]
fn test_search_conditions() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let count = |p: Predicate| {
        let q = QueryBuilder::select_from(&member).filter(p).build().unwrap();
        engine.count(&q).unwrap()
    };

    assert_eq!(count(member.col("age").unwrap().between(10, 30)), 3);
    assert_eq!(count(member.col("age").unwrap().in_list([10i64, 20])), 2);
    assert_eq!(count(member.col("username").unwrap().contains("ber")), 4);
    assert_eq!(count(member.col("username").unwrap().starts_with("member")), 4);
    assert_eq!(count(member.col("username").unwrap().ends_with("4")), 1);
    assert_eq!(count(member.col("age").unwrap().ne(10)), 3);
    assert_eq!(count(Predicate::not(member.col("age").unwrap().gt(10))), 1);
    assert_eq!(
        count(
            member
                .col("age")
                .unwrap()
                .eq(10)
                .or_else(member.col("age").unwrap().eq(40))
        ),
        2
    );
}

#[test]
fn test_ordering_with_null_placement() {
    let schema = schema();
    let mut engine = Engine::new(schema.clone());
    engine
        .insert("member", vec![5.into(), Value::Null, 100.into(), Value::Null])
        .unwrap();
    engine
        .insert("member", vec![6.into(), "member5".into(), 100.into(), Value::Null])
        .unwrap();
    engine
        .insert("member", vec![7.into(), "member6".into(), 100.into(), Value::Null])
        .unwrap();

    let member = schema.table("member").unwrap();
    let q = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().eq(100))
        .order_by([
            member.col("age").unwrap().desc(),
            member.col("username").unwrap().asc().nulls_last(),
        ])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    let names: Vec<Option<String>> = rows
        .iter()
        .map(|r| r.get_string_opt("username").unwrap())
        .collect();
    assert_eq!(
        names,
        vec![Some("member5".into()), Some("member6".into()), None]
    );
}

#[test]
fn test_default_null_placement_follows_direction() {
    let schema = schema();
    let mut engine = Engine::new(schema.clone());
    engine
        .insert("member", vec![1.into(), Value::Null, 10.into(), Value::Null])
        .unwrap();
    engine
        .insert("member", vec![2.into(), "member1".into(), 20.into(), Value::Null])
        .unwrap();

    let member = schema.table("member").unwrap();

    // Ascending: nulls first.
    let asc = QueryBuilder::select_from(&member)
        .order_by([member.col("username").unwrap().asc()])
        .build()
        .unwrap();
    let rows = engine.fetch(&asc).unwrap();
    assert_eq!(rows[0].get_str_opt("username").unwrap(), None);

    // Descending: nulls last.
    let desc = QueryBuilder::select_from(&member)
        .order_by([member.col("username").unwrap().desc()])
        .build()
        .unwrap();
    let rows = engine.fetch(&desc).unwrap();
    assert_eq!(rows[1].get_str_opt("username").unwrap(), None);
}

#[test]
fn test_paging() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let q = QueryBuilder::select_from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .paginate(Pagination::new().skip(2).take(2))
        .build()
        .unwrap();
    let rows = engine.fetch(&q).unwrap();
    assert_eq!(usernames(&rows), vec!["member3", "member4"]);

    // Skipping past the end yields an empty page, not an error.
    let q = QueryBuilder::select_from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .paginate(Pagination::new().skip(10).take(2))
        .build()
        .unwrap();
    assert!(engine.fetch(&q).unwrap().is_empty());
}

#[test]
fn test_aggregate_tuple() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let age = || member.col("age").unwrap();

    let q = QueryBuilder::select([
        Expr::count_all(),
        age().sum(),
        age().avg(),
        age().max(),
        age().min(),
    ])
    .from(&member)
    .build()
    .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_i64("count").unwrap(), 4);
    assert_eq!(row.get_i64("sum").unwrap(), 100);
    assert_eq!(row.get_f64("avg").unwrap(), 25.0);
    assert_eq!(row.get_i64("max").unwrap(), 40);
    assert_eq!(row.get_i64("min").unwrap(), 10);
}

#[test]
fn test_aggregates_over_empty_set() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let q = QueryBuilder::select([Expr::count_all(), member.col("age").unwrap().sum()])
        .from(&member)
        .filter(member.col("age").unwrap().gt(999))
        .build()
        .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_i64("count").unwrap(), 0);
    assert_eq!(row.get_named("sum"), Some(&Value::Null));
}

#[test]
fn test_inner_join() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let team = schema.table("team").unwrap();

    let q = QueryBuilder::select_from(&member)
        .join(
            &team,
            member.col("team_id").unwrap().eq(team.col("id").unwrap()),
        )
        .filter(team.col("name").unwrap().eq("teamA"))
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    assert_eq!(usernames(&rows), vec!["member1", "member2"]);
}

#[test]
fn test_theta_join() {
    let (mut engine, schema) = engine();
    // Members that happen to share a name with a team.
    engine
        .insert("member", vec![5.into(), "teamA".into(), 50.into(), Value::Null])
        .unwrap();
    engine
        .insert("member", vec![6.into(), "teamB".into(), 60.into(), Value::Null])
        .unwrap();

    let member = schema.table("member").unwrap();
    let team = schema.table("team").unwrap();
    let q = QueryBuilder::select([member.col("username").unwrap()])
        .from(&member)
        .cross_join(&team)
        .filter(member.col("username").unwrap().eq(team.col("name").unwrap()))
        .order_by([member.col("username").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    assert_eq!(usernames(&rows), vec!["teamA", "teamB"]);
}

#[test]
fn test_left_join_with_on_condition() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let team = schema.table("team").unwrap();

    // Keep every member; attach the team only when it is teamA.
    let on = member
        .col("team_id")
        .unwrap()
        .eq(team.col("id").unwrap())
        .and_then(team.col("name").unwrap().eq("teamA"));
    let q = QueryBuilder::select_from(&member)
        .left_join(&team, on)
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    assert_eq!(rows.len(), 4);
    let teams: Vec<Option<String>> = rows
        .iter()
        .map(|r| r.get_string_opt("name").unwrap())
        .collect();
    assert_eq!(
        teams,
        vec![Some("teamA".into()), Some("teamA".into()), None, None]
    );
}

#[test]
fn test_subquery_eq_max() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    let max_age = QueryBuilder::select([sub.col("age").unwrap().max()])
        .from(&sub)
        .build()
        .unwrap();
    let q = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().eq_subquery(max_age))
        .build()
        .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_str("username").unwrap(), "member4");
    assert_eq!(row.get_i64("age").unwrap(), 40);
}

#[test]
fn test_subquery_gte_avg() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    let avg_age = QueryBuilder::select([sub.col("age").unwrap().avg()])
        .from(&sub)
        .build()
        .unwrap();
    let q = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().gte_subquery(avg_age))
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    assert_eq!(usernames(&rows), vec!["member3", "member4"]);
}

#[test]
fn test_subquery_in() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    let adult_ages = QueryBuilder::select([sub.col("age").unwrap()])
        .from(&sub)
        .filter(sub.col("age").unwrap().gt(10))
        .build()
        .unwrap();
    let q = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().in_subquery(adult_ages))
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    assert_eq!(usernames(&rows), vec!["member2", "member3", "member4"]);
}

#[test]
fn test_subquery_in_select_position() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    let avg_age = QueryBuilder::select([sub.col("age").unwrap().avg()])
        .from(&sub)
        .build()
        .unwrap();
    let q = QueryBuilder::select([
        member.col("username").unwrap(),
        Expr::subquery(avg_age).alias("avg_age"),
    ])
    .from(&member)
    .filter(member.col("username").unwrap().eq("member1"))
    .build()
    .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_str("username").unwrap(), "member1");
    assert_eq!(row.get_f64("avg_age").unwrap(), 25.0);
}

#[test]
fn test_scalar_subquery_cardinality_enforced() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    // The subquery matches two rows; using it as a scalar fails at execution.
    let two_rows = QueryBuilder::select([sub.col("age").unwrap()])
        .from(&sub)
        .filter(sub.col("age").unwrap().lt(25))
        .build()
        .unwrap();
    let q = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().eq(Expr::subquery(two_rows)))
        .build()
        .unwrap();

    let err = engine.fetch(&q).unwrap_err();
    assert_eq!(err.code, ErrorCode::ScalarSubqueryCardinality);
    assert_eq!(err.code.code(), "Q4001");
}

#[test]
fn test_simple_case() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let label = member
        .col("age")
        .unwrap()
        .when(10)
        .then("ten")
        .when(20)
        .then("twenty")
        .otherwise("other")
        .alias("label");
    let q = QueryBuilder::select([label])
        .from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    let labels: Vec<String> = rows.iter().map(|r| r.get_string("label").unwrap()).collect();
    assert_eq!(labels, vec!["ten", "twenty", "other", "other"]);
}

#[test]
fn test_searched_case_first_match_wins() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let age = || member.col("age").unwrap();

    let bracket = Case::when(age().between(0, 20))
        .then("0~20")
        .when(age().between(21, 30))
        .then("21~30")
        .otherwise("etc")
        .alias("bracket");
    let q = QueryBuilder::select([bracket])
        .from(&member)
        .order_by([age().asc()])
        .build()
        .unwrap();

    let rows = engine.fetch(&q).unwrap();
    let brackets: Vec<String> = rows
        .iter()
        .map(|r| r.get_string("bracket").unwrap())
        .collect();
    assert_eq!(brackets, vec!["0~20", "0~20", "21~30", "etc"]);
}

#[test]
fn test_constant_in_select() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let q = QueryBuilder::select([member.col("username").unwrap(), val("A")])
        .from(&member)
        .filter(member.col("username").unwrap().eq("member1"))
        .build()
        .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    // A bare literal has no output name; it gets a positional one.
    assert_eq!(row.get_str("c1").unwrap(), "A");
}

#[test]
fn test_concat_with_str_cast() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let label = member
        .col("username")
        .unwrap()
        .concat("_")
        .concat(member.col("age").unwrap().str_value())
        .alias("label");
    let q = QueryBuilder::select([label])
        .from(&member)
        .filter(member.col("username").unwrap().eq("member1"))
        .build()
        .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_str("label").unwrap(), "member1_10");
}

#[test]
fn test_scalar_functions() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let q = QueryBuilder::select([
        member
            .col("username")
            .unwrap()
            .replace("member", "M")
            .alias("short"),
        member.col("username").unwrap().upper().alias("loud"),
    ])
    .from(&member)
    .filter(member.col("username").unwrap().eq("member1"))
    .build()
    .unwrap();

    let row = engine.fetch_one(&q).unwrap();
    assert_eq!(row.get_str("short").unwrap(), "M1");
    assert_eq!(row.get_str("loud").unwrap(), "MEMBER1");
}

// ============== Projections ==============

#[derive(Debug, Default, PartialEq)]
struct MemberDto {
    username: String,
    age: i64,
}

impl NamedTarget for MemberDto {
    fn set_field(&mut self, name: &str, value: Value) -> QueryResult<()> {
        match name {
            "username" => self.username = FromValue::from_value(value)?,
            "age" => self.age = FromValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
struct MemberTuple {
    username: String,
    age: i64,
}

impl FromValues for MemberTuple {
    const ARITY: usize = 2;

    fn from_values(values: Vec<Value>) -> QueryResult<Self> {
        let mut values = values.into_iter();
        Ok(Self {
            username: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
            age: FromValue::from_value(values.next().unwrap_or(Value::Null))?,
        })
    }
}

#[derive(Debug, Default, PartialEq)]
struct UserDto {
    name: String,
    age: i64,
}

impl NamedTarget for UserDto {
    fn set_field(&mut self, name: &str, value: Value) -> QueryResult<()> {
        match name {
            "name" => self.name = FromValue::from_value(value)?,
            "age" => self.age = FromValue::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

#[test]
fn test_projection_by_name() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let mapper = Mapper::<MemberDto>::by_name([
        member.col("username").unwrap(),
        member.col("age").unwrap(),
    ])
    .unwrap();
    let q = QueryBuilder::select_with(&mapper)
        .from(&member)
        .filter(member.col("age").unwrap().eq(10))
        .build()
        .unwrap();

    let dtos = engine.fetch_as(&q, &mapper).unwrap();
    assert_eq!(
        dtos,
        vec![MemberDto {
            username: "member1".into(),
            age: 10
        }]
    );
}

#[test]
fn test_projection_by_name_with_aliases() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let sub = schema.alias("member", "member_sub").unwrap();

    // Field names differ from column names; aliases carry the mapping,
    // including for a subquery expression.
    let max_age = QueryBuilder::select([sub.col("age").unwrap().max()])
        .from(&sub)
        .build()
        .unwrap();
    let mapper = Mapper::<UserDto>::by_name([
        member.col("username").unwrap().alias("name"),
        Expr::subquery(max_age).alias("age"),
    ])
    .unwrap();
    let q = QueryBuilder::select_with(&mapper)
        .from(&member)
        .filter(member.col("username").unwrap().eq("member1"))
        .build()
        .unwrap();

    let dtos = engine.fetch_as(&q, &mapper).unwrap();
    assert_eq!(
        dtos,
        vec![UserDto {
            name: "member1".into(),
            age: 40
        }]
    );
}

#[test]
fn test_projection_by_constructor() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let mapper = Mapper::<MemberTuple>::by_constructor([
        member.col("username").unwrap(),
        member.col("age").unwrap(),
    ])
    .unwrap();
    let q = QueryBuilder::select_with(&mapper)
        .from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();

    let dtos = engine.fetch_as(&q, &mapper).unwrap();
    assert_eq!(dtos.len(), 4);
    assert_eq!(dtos[3].username, "member4");
    assert_eq!(dtos[3].age, 40);
}

#[test]
fn test_projection_arity_fails_before_rows() {
    let schema = schema();
    let member = schema.table("member").unwrap();

    let err = Mapper::<MemberTuple>::by_constructor([member.col("username").unwrap()]).unwrap_err();
    assert_eq!(err.code, ErrorCode::ProjectionArity);
}

#[test]
fn test_projection_explicit() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let mapper = Mapper::explicit2(
        member.col("username").unwrap(),
        member.col("age").unwrap(),
        |username: String, age: i64| MemberTuple { username, age },
    );
    let q = QueryBuilder::select_with(&mapper)
        .from(&member)
        .filter(member.col("age").unwrap().eq(20))
        .build()
        .unwrap();

    let dtos = engine.fetch_as(&q, &mapper).unwrap();
    assert_eq!(
        dtos,
        vec![MemberTuple {
            username: "member2".into(),
            age: 20
        }]
    );
}

// ============== Bulk mutations ==============

#[test]
fn test_bulk_update_constant() {
    let (mut engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let m = UpdateBuilder::table(&member)
        .set("username", "nonmember")
        .filter(member.col("age").unwrap().lt(28))
        .build()
        .unwrap();
    assert_eq!(engine.execute(&m).unwrap(), 2);

    let q = QueryBuilder::select_from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();
    let rows = engine.fetch(&q).unwrap();
    assert_eq!(
        usernames(&rows),
        vec!["nonmember", "nonmember", "member3", "member4"]
    );
}

#[test]
fn test_bulk_update_reads_old_values() {
    let (mut engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let m = UpdateBuilder::table(&member)
        .set("age", member.col("age").unwrap().mul(2))
        .build()
        .unwrap();
    assert_eq!(engine.execute(&m).unwrap(), 4);

    let q = QueryBuilder::select_from(&member)
        .order_by([member.col("age").unwrap().asc()])
        .build()
        .unwrap();
    let ages: Vec<i64> = engine
        .fetch(&q)
        .unwrap()
        .iter()
        .map(|r| r.get_i64("age").unwrap())
        .collect();
    assert_eq!(ages, vec![20, 40, 60, 80]);
}

#[test]
fn test_bulk_delete() {
    let (mut engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let m = DeleteBuilder::table(&member)
        .filter(member.col("age").unwrap().gt(18))
        .build()
        .unwrap();
    assert_eq!(engine.execute(&m).unwrap(), 3);
    assert_eq!(engine.table_len("member").unwrap(), 1);
}

#[test]
fn test_mutation_signals_invalidation() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    let (mut engine, schema) = engine();
    let member = schema.table("member").unwrap();
    let invalidated = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invalidated);
    engine.on_invalidate(move |table| {
        assert_eq!(table, "member");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let update = UpdateBuilder::table(&member)
        .set("username", "nonmember")
        .filter(member.col("age").unwrap().lt(28))
        .build()
        .unwrap();
    engine.execute(&update).unwrap();

    let delete = DeleteBuilder::table(&member)
        .filter(member.col("age").unwrap().gt(18))
        .build()
        .unwrap();
    engine.execute(&delete).unwrap();

    assert_eq!(invalidated.load(Ordering::SeqCst), 2);
}

// ============== Fetch variants ==============

#[test]
fn test_fetch_variants() {
    let (engine, schema) = engine();
    let member = schema.table("member").unwrap();

    let all = QueryBuilder::select_from(&member).build().unwrap();
    assert_eq!(engine.count(&all).unwrap(), 4);

    let first = QueryBuilder::select_from(&member)
        .order_by([member.col("age").unwrap().desc()])
        .build()
        .unwrap();
    let row = engine.fetch_first(&first).unwrap().unwrap();
    assert_eq!(row.get_str("username").unwrap(), "member4");

    let none = QueryBuilder::select_from(&member)
        .filter(member.col("age").unwrap().gt(999))
        .build()
        .unwrap();
    assert!(engine.fetch_first(&none).unwrap().is_none());
    assert_eq!(
        engine.fetch_one(&none).unwrap_err().code,
        ErrorCode::RecordNotFound
    );
    assert_eq!(
        engine.fetch_one(&all).unwrap_err().code,
        ErrorCode::NotUnique
    );
}
