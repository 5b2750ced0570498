use criterion::{black_box, criterion_group, criterion_main, Criterion};

use smartscrab::{from_smarts, get_smarts_matches, to_smarts, Atom, Bond, BondOrder, Mol};

const CARBOXYL: &str = "[CX3](=O)[OX2H1]";
const GROUPED: &str = "([#8].[#6]).([#8].[#6])";
const RECURSIVE: &str = "[$([CX4;!R][#6]),$([NX3;H2,H1;!$(NC=O)])]-,:[c,n;R1]";
const STEROID: &str = "C1CCC2C(C1)CCC1C2CCC2CCCC12";

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("carboxyl", |b| {
        b.iter(|| black_box(from_smarts(black_box(CARBOXYL)).unwrap()))
    });
    group.bench_function("grouped", |b| {
        b.iter(|| black_box(from_smarts(black_box(GROUPED)).unwrap()))
    });
    group.bench_function("recursive", |b| {
        b.iter(|| black_box(from_smarts(black_box(RECURSIVE)).unwrap()))
    });
    group.bench_function("steroid", |b| {
        b.iter(|| black_box(from_smarts(black_box(STEROID)).unwrap()))
    });

    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let carboxyl = from_smarts(CARBOXYL).unwrap();
    let recursive = from_smarts(RECURSIVE).unwrap();
    let steroid = from_smarts(STEROID).unwrap();

    let mut group = c.benchmark_group("write");

    group.bench_function("carboxyl", |b| {
        b.iter(|| black_box(to_smarts(black_box(&carboxyl))))
    });
    group.bench_function("recursive", |b| {
        b.iter(|| black_box(to_smarts(black_box(&recursive))))
    });
    group.bench_function("steroid", |b| {
        b.iter(|| black_box(to_smarts(black_box(&steroid))))
    });

    group.finish();
}

/// Straight-chain alkane with `n` carbons.
fn alkane(n: usize) -> Mol<Atom, Bond> {
    let mut mol = Mol::new();
    let idx: Vec<_> = (0..n)
        .map(|i| {
            let degree = u8::from(i > 0) + u8::from(i + 1 < n);
            mol.add_atom(Atom {
                atomic_num: 6,
                degree,
                total_h_count: 4 - degree,
                implicit_h_count: 4 - degree,
                valence: 4,
                ..Atom::default()
            })
        })
        .collect();
    for pair in idx.windows(2) {
        mol.add_bond(pair[0], pair[1], Bond::new(BondOrder::Single));
    }
    mol
}

fn bench_match(c: &mut Criterion) {
    let target = alkane(40);
    let methylene = from_smarts("[CH2][CH2][CH2]").unwrap();
    let any_chain = from_smarts("C~C~C~C~C").unwrap();
    let recursive = from_smarts("[$(C[CH3])]C").unwrap();

    let mut group = c.benchmark_group("match");

    group.bench_function("methylene", |b| {
        b.iter(|| black_box(get_smarts_matches(black_box(&target), black_box(&methylene))))
    });
    group.bench_function("any_chain", |b| {
        b.iter(|| black_box(get_smarts_matches(black_box(&target), black_box(&any_chain))))
    });
    group.bench_function("recursive", |b| {
        b.iter(|| black_box(get_smarts_matches(black_box(&target), black_box(&recursive))))
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_write, bench_match);
criterion_main!(benches);
