use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlweave::expr::{and, eq};
use sqlweave::{Column, ColumnType, PgDialect, QueryBuilder, Sql, Table};

/// A table `t` with columns `col0 .. col{n-1}`.
fn wide_table(n: usize) -> Table {
    (0..n).fold(Table::new("t"), |table, i| {
        table.column(Column::new(format!("col{i}"), ColumnType::Integer))
    })
}

/// select col0, ... from t where (col0 = $1 and col1 = $2 ...)
fn build_where(table: &Table, n: usize) -> Sql {
    and((0..n).map(|i| eq(&table.columns()[i], i as i64)))
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/render");

    for n in [1, 5, 10, 50, 100] {
        let table = wide_table(n);
        let sql = QueryBuilder::new(PgDialect)
            .select()
            .from(&table)
            .where_(build_where(&table, n))
            .to_sql()
            .expect("select compiles");
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(sql.to_query(&PgDialect)));
        });
    }

    group.finish();
}

fn bench_build_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/build_and_render");

    for n in [1, 5, 10, 50, 100] {
        let table = wide_table(n);
        let qb = QueryBuilder::new(PgDialect);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let query = qb
                    .select()
                    .from(&table)
                    .where_(build_where(&table, n))
                    .limit(10)
                    .to_query();
                black_box(query)
            });
        });
    }

    group.finish();
}

fn bench_join_reshape(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/joins");

    for joins in [1, 4, 16] {
        let base = wide_table(8);
        let others: Vec<Table> = (0..joins).map(|i| base.alias(format!("j{i}"))).collect();
        let qb = QueryBuilder::new(PgDialect);
        group.bench_with_input(BenchmarkId::from_parameter(joins), &others, |b, others| {
            b.iter(|| {
                let select = others.iter().try_fold(qb.select().from(&base), |select, other| {
                    select.left_join(other, eq(&other["col0"], &base["col0"]))
                });
                black_box(select.and_then(|s| s.to_query()))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_render,
    bench_build_and_render,
    bench_join_reshape
);
criterion_main!(benches);
