//! Golden-SQL checks of the statement compiler through the public API.

use sqlweave::expr::{and, asc, eq, gt, sql_placeholder};
use sqlweave::{
    Column, ColumnType, Fields, MySqlDialect, Nullability, PgDialect, Placeholders,
    QueryBuilder, QueryParam, Selection, Source, Sql, SqliteDialect, Table, Value, WeaveResult,
};

fn users() -> Table {
    Table::new("users")
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("name", ColumnType::Text).not_null())
}

fn pets() -> Table {
    Table::new("pets")
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("owner_id", ColumnType::Integer))
}

fn toys() -> Table {
    Table::new("toys")
        .column(Column::new("id", ColumnType::Integer).primary_key())
        .column(Column::new("pet_id", ColumnType::Integer))
}

#[test]
fn projection_matches_flattened_fields() -> WeaveResult<()> {
    let (users, pets, toys) = (users(), pets(), toys());
    let select = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .inner_join(&toys, eq(&toys["pet_id"], &pets["id"]))?;

    let flattened = select.fields().flatten();
    assert_eq!(flattened.len(), select.fields().leaf_count());
    let paths: Vec<String> = flattened.iter().map(|f| f.path.join(".")).collect();
    assert_eq!(
        paths,
        [
            "users.id",
            "users.name",
            "pets.id",
            "pets.owner_id",
            "toys.id",
            "toys.pet_id"
        ]
    );

    let query = select.to_query()?;
    assert_eq!(
        query.sql,
        concat!(
            r#"select "users"."id", "users"."name", "pets"."id", "pets"."owner_id", "toys"."id", "toys"."pet_id" "#,
            r#"from "users" left join "pets" on "pets"."owner_id" = "users"."id" "#,
            r#"inner join "toys" on "toys"."pet_id" = "pets"."id""#
        )
    );
    Ok(())
}

#[test]
fn single_relation_renders_bare_names() -> WeaveResult<()> {
    let t = Table::new("t")
        .column(Column::new("id", ColumnType::Integer))
        .column(Column::new("name", ColumnType::Text));
    let query = QueryBuilder::new(PgDialect).select().from(&t).to_query()?;
    assert_eq!(query.sql, r#"select "id", "name" from "t""#);
    Ok(())
}

#[test]
fn first_join_reshapes_base_columns() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let select = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?;

    assert!(matches!(
        select.fields().get("users"),
        Some(Selection::Nested(_))
    ));
    assert!(matches!(
        select.fields().get("pets"),
        Some(Selection::Nested(_))
    ));
    assert_eq!(
        select.to_query()?.sql,
        r#"select "users"."id", "users"."name", "pets"."id", "pets"."owner_id" from "users" left join "pets" on "pets"."owner_id" = "users"."id""#
    );
    Ok(())
}

#[test]
fn unaliased_join_does_not_reshape_twice() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let select = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .inner_join(
            Source::raw(Sql::raw("generate_series(1, 3) g")),
            Sql::raw("true"),
        )?
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?;

    let paths: Vec<String> = select
        .fields()
        .flatten()
        .iter()
        .map(|f| f.path.join("."))
        .collect();
    assert_eq!(paths, ["users.id", "users.name", "pets.id", "pets.owner_id"]);
    assert_eq!(select.nullability().get("pets"), Some(Nullability::Nullable));
    Ok(())
}

#[test]
fn right_and_full_joins_make_prior_aliases_nullable() -> WeaveResult<()> {
    let (users, pets, toys) = (users(), pets(), toys());
    let select = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .right_join(&pets, eq(&pets["owner_id"], &users["id"]))?;
    assert_eq!(select.nullability().get("users"), Some(Nullability::Nullable));
    assert_eq!(select.nullability().get("pets"), Some(Nullability::NotNull));

    let select = select.full_join(&toys, eq(&toys["pet_id"], &pets["id"]))?;
    for alias in ["users", "pets", "toys"] {
        assert_eq!(
            select.nullability().get(alias),
            Some(Nullability::Nullable),
            "{alias}"
        );
    }
    Ok(())
}

#[test]
fn full_join_unsupported_on_mysql() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let err = QueryBuilder::new(MySqlDialect)
        .select()
        .from(&users)
        .full_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .to_query()
        .unwrap_err();
    assert!(matches!(err, sqlweave::WeaveError::Unsupported { .. }));
    Ok(())
}

#[test]
fn params_follow_construction_order() -> WeaveResult<()> {
    let users = users();
    let mut tagged = Sql::raw("/* a */ ");
    tagged.append(eq(&users["id"], 1));
    let condition = and([tagged, eq(&users["name"], "ann")]);
    let query = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .where_(condition)
        .to_query()?;
    assert_eq!(
        query.sql,
        r#"select "id", "name" from "users" where (/* a */ "users"."id" = $1 and "users"."name" = $2)"#
    );
    assert_eq!(
        query.params,
        vec![
            QueryParam::Value(Value::Int(1)),
            QueryParam::Value(Value::Text("ann".into())),
        ]
    );
    Ok(())
}

#[test]
fn placeholders_bind_in_position() -> WeaveResult<()> {
    let users = users();
    let query = QueryBuilder::new(SqliteDialect)
        .select()
        .from(&users)
        .where_(and([
            gt(&users["id"], sql_placeholder("min")),
            eq(&users["name"], "ann"),
        ]))
        .limit(sql_placeholder("n"))
        .to_query()?;
    assert_eq!(
        query.sql,
        r#"select "id", "name" from "users" where ("users"."id" > ? and "users"."name" = ?) limit ?"#
    );

    let bound = query.bind(&Placeholders::new().set("min", 3).set("n", 10))?;
    assert_eq!(
        bound.params,
        vec![Value::Int(3), Value::Text("ann".into()), Value::Int(10)]
    );
    assert!(query.bind(&Placeholders::new().set("min", 3)).is_err());
    Ok(())
}

#[test]
fn nested_set_operation_is_grouped() -> WeaveResult<()> {
    let users = users();
    let qb = QueryBuilder::new(PgDialect);
    let inner = qb
        .select()
        .from(&users)
        .where_(eq(&users["id"], 2))
        .union_all(qb.select().from(&users).where_(eq(&users["id"], 3)));
    let query = qb
        .select()
        .from(&users)
        .where_(eq(&users["id"], 1))
        .union(inner)
        .order_by([asc(&users["id"])])
        .limit(5)
        .to_query()?;
    assert_eq!(
        query.sql,
        concat!(
            r#"select "id", "name" from "users" where "users"."id" = $1 union "#,
            r#"(select "id", "name" from "users" where "users"."id" = $2 union all "#,
            r#"select "id", "name" from "users" where "users"."id" = $3) "#,
            r#"order by "id" asc limit $4"#
        )
    );
    assert_eq!(query.sql.matches("order by").count(), 1);
    assert_eq!(query.params.len(), 4);
    Ok(())
}

#[test]
fn compiling_twice_is_identical() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let select = QueryBuilder::new(PgDialect)
        .select()
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?
        .where_(gt(&users["id"], 10))
        .order_by([asc(&users["name"])])
        .limit(20);
    let first = select.to_query()?;
    let second = select.to_query()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn partial_select_is_never_reshaped() -> WeaveResult<()> {
    let (users, pets) = (users(), pets());
    let select = QueryBuilder::new(PgDialect)
        .select_fields(Fields::new().with("pet_id", &pets["id"]))
        .from(&users)
        .left_join(&pets, eq(&pets["owner_id"], &users["id"]))?;

    let keys: Vec<_> = select.fields().keys().collect();
    assert_eq!(keys, ["pet_id"]);
    assert!(select.fields().get("users").is_none());
    assert_eq!(
        select.to_query()?.sql,
        r#"select "pets"."id" from "users" left join "pets" on "pets"."owner_id" = "users"."id""#
    );
    Ok(())
}

#[test]
fn dialects_quote_and_number_differently() -> WeaveResult<()> {
    let users = users();
    let build = |qb: QueryBuilder| {
        qb.select()
            .from(&users)
            .where_(eq(&users["id"], 1))
            .to_query()
            .map(|q| q.sql)
    };
    assert_eq!(
        build(QueryBuilder::new(PgDialect))?,
        r#"select "id", "name" from "users" where "users"."id" = $1"#
    );
    assert_eq!(
        build(QueryBuilder::new(SqliteDialect))?,
        r#"select "id", "name" from "users" where "users"."id" = ?"#
    );
    assert_eq!(
        build(QueryBuilder::new(MySqlDialect))?,
        "select `id`, `name` from `users` where `users`.`id` = ?"
    );
    Ok(())
}
