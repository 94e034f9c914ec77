use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dfd_engine::geometry::Point;
use dfd_engine::model::{Diagram, Edge, Level, Node, NodeKind};
use dfd_engine::{EngineConfig, compute_level_layout, filter_for_display, validate};
use std::hint::black_box;

/// Synthetic level-1 diagram: a ring of processes around a shared store,
/// with entities fanning flows into every process.
fn dense_diagram(processes: usize, entities: usize) -> Diagram {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    nodes.push(Node {
        id: "store".to_string(),
        label: "Ledger".to_string(),
        level: Level::One,
        position: Point::new(700.0, 700.0),
        parent_process: None,
        kind: NodeKind::DataStore {
            store_code: "D1".to_string(),
            width: 160.0,
            height: 80.0,
        },
    });

    for i in 0..processes {
        let angle = (i as f32) / (processes as f32) * std::f32::consts::TAU;
        nodes.push(Node {
            id: format!("p{i}"),
            label: format!("Process {i}"),
            level: Level::One,
            position: Point::new(700.0 + 500.0 * angle.cos(), 700.0 + 500.0 * angle.sin()),
            parent_process: None,
            kind: NodeKind::Process {
                process_number: format!("{}.0", i + 1),
                diameter: 200.0,
            },
        });
        edges.push(edge(
            &format!("f-store-{i}"),
            &format!("p{i}"),
            "store",
            "ledger entry",
        ));
        edges.push(edge(
            &format!("f-chain-{i}"),
            &format!("p{i}"),
            &format!("p{}", (i + 1) % processes),
            "handoff",
        ));
    }

    for i in 0..entities {
        nodes.push(Node {
            id: format!("e{i}"),
            label: format!("Entity {i}"),
            level: Level::One,
            position: Point::new(80.0 + (i as f32) * 180.0, 40.0),
            parent_process: None,
            kind: NodeKind::Entity {
                width: 120.0,
                height: 120.0,
            },
        });
        edges.push(edge(
            &format!("f-in-{i}"),
            &format!("e{i}"),
            &format!("p{}", i % processes),
            "request",
        ));
        edges.push(edge(
            &format!("f-out-{i}"),
            &format!("p{}", i % processes),
            &format!("e{i}"),
            "response",
        ));
    }

    Diagram {
        id: "bench".to_string(),
        name: "bench".to_string(),
        system_name: String::new(),
        level: Level::One,
        nodes,
        edges,
        parent_diagram: None,
    }
}

fn edge(id: &str, source: &str, target: &str, label: &str) -> Edge {
    Edge {
        id: id.to_string(),
        label: label.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        level: Level::One,
        source_offset: 0.0,
        target_offset: 0.0,
        route: None,
        label_offset: 0.5,
    }
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = EngineConfig::default();
    for (processes, entities) in [(4usize, 8usize), (8, 24), (16, 48)] {
        let name = format!("dense_{}_{}", processes, entities);
        let diagram = dense_diagram(processes, entities);
        group.bench_with_input(BenchmarkId::from_parameter(name), &diagram, |b, data| {
            b.iter(|| {
                let layout = compute_level_layout(black_box(data), Level::One, &config);
                black_box(layout.edges.len());
            });
        });
    }
    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    for (processes, entities) in [(4usize, 8usize), (8, 24), (16, 48)] {
        let name = format!("dense_{}_{}", processes, entities);
        let diagram = dense_diagram(processes, entities);
        group.bench_with_input(BenchmarkId::from_parameter(name), &diagram, |b, data| {
            b.iter(|| {
                let findings = filter_for_display(validate(black_box(data)), data);
                black_box(findings.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_layout, bench_validate
);
criterion_main!(benches);
