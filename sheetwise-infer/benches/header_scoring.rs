use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use sheetwise_infer::{GridSource, InferenceOptions, detect_header_row, infer_table};

fn ledger(rows: usize) -> Vec<Vec<String>> {
    let mut grid = vec![
        vec!["Quarterly ledger".to_string()],
        vec!["Prepared by accounts".to_string()],
        vec![],
        vec![
            "Date".to_string(),
            "Vendor".to_string(),
            "Category".to_string(),
            "Amount".to_string(),
            "Notes".to_string(),
        ],
    ];
    let categories = ["Travel", "Meals", "Supplies", "Software"];
    grid.extend((0..rows).map(|i| {
        vec![
            format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1),
            format!("Vendor {}", i % 37),
            categories[i % categories.len()].to_string(),
            format!("${}.{:02}", i * 3 % 500, i % 100),
            format!("line item number {i} for the monthly close"),
        ]
    }));
    grid
}

fn bench_header_scoring(c: &mut Criterion) {
    let small = ledger(30);
    let large = ledger(2_000);
    let opts = InferenceOptions::default();

    c.bench_function("detect_header_row/30", |b| {
        b.iter(|| detect_header_row(black_box(&small), opts.header_scan_rows))
    });
    c.bench_function("infer_table/2000", |b| {
        b.iter(|| {
            infer_table(
                "Ledger",
                GridSource::new("bench", Some("Ledger")),
                black_box(&large),
                &opts,
            )
        })
    });
}

criterion_group!(benches, bench_header_scoring);
criterion_main!(benches);
