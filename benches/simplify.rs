use criterion::{Criterion, criterion_group, criterion_main};
use linden::{Context, differentiate, optimize, parse};

const FORMULA: &str = "x*sin(x)/(1+x*x)+ln(1+x*x)*cos(x)-x^3";

fn b_parse(c: &mut Criterion) {
    c.bench_function("parse_formula", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            parse(std::hint::black_box(FORMULA), &mut ctx.vars).unwrap()
        })
    });
}

fn b_differentiate(c: &mut Criterion) {
    let mut ctx = Context::new();
    let tree = parse(FORMULA, &mut ctx.vars).unwrap();
    c.bench_function("differentiate_formula", |b| {
        b.iter(|| differentiate(std::hint::black_box(&tree), "x", &mut ctx).unwrap())
    });
}

fn b_pipeline(c: &mut Criterion) {
    c.bench_function("parse_differentiate_optimize", |b| {
        b.iter(|| {
            let mut ctx = Context::new();
            let tree = parse(std::hint::black_box(FORMULA), &mut ctx.vars).unwrap();
            let mut deriv = differentiate(&tree, "x", &mut ctx).unwrap();
            optimize(&mut deriv).unwrap();
            deriv
        })
    });
}

criterion_group!(bench, b_parse, b_differentiate, b_pipeline);
criterion_main!(bench);
