//! Performance benchmarks for ziggurat core tree operations
//!
//! Run with: `cargo bench -p ziggurat-core`
//!
//! These benchmarks measure critical path performance:
//! - Sibling reordering (move_to_position within one parent)
//! - Cross-branch moves including the cycle check
//! - Subtree retrieval and nested assembly

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use ziggurat_core::config::TreeConfig;
use ziggurat_core::db::{MemoryStore, NodeSession, NodeStore, TursoStore};
use ziggurat_core::models::{NewResource, ResourceId, ResourceKind};
use ziggurat_core::services::{ParentTarget, ResourceTreeService};

/// Setup a TursoStore with a fresh database
async fn setup_turso_store() -> (TursoStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let config = TreeConfig::with_database_path(temp_dir.path().join("bench.db"));
    let store = TursoStore::open(config).await.unwrap();
    (store, temp_dir)
}

/// Create `fanout` children under each resource, `depth` levels deep, below one root
///
/// Returns the root id.
async fn populate<St: NodeStore>(store: &St, fanout: usize, depth: usize) -> ResourceId {
    let service = ResourceTreeService::new();
    let mut session = store.begin().await.unwrap();

    let root = service
        .create_resource(&mut session, NewResource::new("root", ResourceKind::Folder))
        .await
        .unwrap();

    let mut level = vec![root.id];
    for d in 0..depth {
        let mut next = Vec::with_capacity(level.len() * fanout);
        for parent_id in &level {
            for i in 0..fanout {
                let child = service
                    .create_resource(
                        &mut session,
                        NewResource::new(format!("L{}-{}", d, i), ResourceKind::Folder)
                            .with_parent(*parent_id),
                    )
                    .await
                    .unwrap();
                next.push(child.id);
            }
        }
        level = next;
    }

    session.commit().await.unwrap();
    root.id
}

/// Benchmark reordering within a 100-sibling group
///
/// Each iteration moves the last child to the front, shifting every other sibling.
fn bench_sibling_reorder(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("sibling_reorder");

    group.bench_function("memory_100_siblings", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let store = MemoryStore::new();
                let root = populate(&store, 100, 1).await;
                let service = ResourceTreeService::new();

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    let mut session = store.begin().await.unwrap();
                    let last = session.children_of(Some(root)).await.unwrap()[99].id;
                    service
                        .move_to_position(&mut session, last, 1, ParentTarget::Unchanged)
                        .await
                        .unwrap();
                    session.commit().await.unwrap();
                }
                start.elapsed()
            })
        });
    });

    group.bench_function("turso_100_siblings", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_turso_store().await;
                let root = populate(&store, 100, 1).await;
                let service = ResourceTreeService::new();

                let start = std::time::Instant::now();
                for _ in 0..iters {
                    let mut session = store.begin().await.unwrap();
                    let last = session.children_of(Some(root)).await.unwrap()[99].id;
                    service
                        .move_to_position(&mut session, last, 1, ParentTarget::Unchanged)
                        .await
                        .unwrap();
                    session.commit().await.unwrap();
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

/// Benchmark moving a leaf between two deep branches and back
fn bench_cross_branch_move(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("turso_cross_branch_move", |b| {
        b.iter_custom(|iters| {
            rt.block_on(async {
                let (store, _temp) = setup_turso_store().await;
                let root = populate(&store, 4, 4).await;
                let service = ResourceTreeService::new();

                let mut session = store.begin().await.unwrap();
                let branches = session.children_of(Some(root)).await.unwrap();
                let (left, right) = (branches[0].id, branches[3].id);
                let leaf = session.children_of(Some(left)).await.unwrap()[0].id;
                session.commit().await.unwrap();

                let start = std::time::Instant::now();
                for i in 0..iters {
                    let target = if i % 2 == 0 { right } else { left };
                    let mut session = store.begin().await.unwrap();
                    service
                        .move_to_position(&mut session, leaf, 1, ParentTarget::Resource(target))
                        .await
                        .unwrap();
                    session.commit().await.unwrap();
                }
                start.elapsed()
            })
        });
    });
}

/// Benchmark full subtree retrieval of a 4-ary tree, 4 levels deep (341 resources)
fn bench_subtree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("subtree");
    group.sample_size(20);

    let (turso, _temp) = rt.block_on(setup_turso_store());
    let turso_root = rt.block_on(populate(&turso, 4, 4));
    let memory = MemoryStore::new();
    let memory_root = rt.block_on(populate(&memory, 4, 4));
    let service = ResourceTreeService::new();

    group.bench_function("turso_rows", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut session = turso.begin().await.unwrap();
                let rows = service
                    .subtree_from(&mut session, turso_root, None)
                    .await
                    .unwrap();
                session.rollback().await.unwrap();
                black_box(rows)
            })
        });
    });

    group.bench_function("memory_struct", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut session = memory.begin().await.unwrap();
                let tree = service
                    .subtree_struct_from(&mut session, memory_root, None)
                    .await
                    .unwrap();
                session.rollback().await.unwrap();
                black_box(tree)
            })
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sibling_reorder,
    bench_cross_branch_move,
    bench_subtree
);
criterion_main!(benches);
