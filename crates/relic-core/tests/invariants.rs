//! 推导图不变量：幂等、确定性、传播、排序、去重、无悬挂链接、失败隔离

use relic_core::prelude::*;

fn config(level: usize) -> EngineConfig {
    EngineConfig {
        acceptable_difference: 0.01,
        inception_level: level,
        ..Default::default()
    }
}

fn triangle() -> Vec<SeedRecord> {
    vec![
        SeedRecord::point(1, 0.0, 0.0, 0.0),
        SeedRecord::point(2, 1.0, 100.0, 0.0),
        SeedRecord::point(3, 2.0, 30.0, 70.0),
    ]
}

fn assert_invariants(graph: &LayerCollection) {
    for object in graph.arena().iter() {
        assert!(!object.is_disposed());

        for parent in object.parent_objects() {
            let parent = graph.object(*parent).expect("dangling parent link");
            assert!(parent.child_objects().contains(&object.id()));
            assert!(parent.layer() < object.layer());
        }
        for child in object.child_objects() {
            let child = graph.object(*child).expect("dangling child link");
            assert!(child.parent_objects().contains(&object.id()));
        }

        if object.is_locked() || object.parent_objects().is_empty() {
            continue;
        }
        let parents: Vec<&RelevantObject> = object
            .parent_objects()
            .iter()
            .filter_map(|p| graph.object(*p))
            .collect();
        let mean = parents.iter().map(|p| p.time()).sum::<f64>() / parents.len() as f64;
        let max = parents.iter().map(|p| p.relevancy()).fold(0.0, f64::max);
        assert!((object.time() - mean).abs() < 1e-9, "time of {} not settled", object.id());
        assert!((object.relevancy() - object.relevancy_ratio() * max).abs() < 1e-9);
    }

    let tolerance = graph.config().acceptable_difference;
    for layer in graph.layers() {
        assert!(layer.collection().is_sorted(graph.arena()));
        for kind in ObjectKind::ALL {
            let bucket = layer.collection().bucket(kind);
            for (i, a) in bucket.iter().enumerate() {
                for b in &bucket[i + 1..] {
                    let a = graph.object(*a).unwrap();
                    let b = graph.object(*b).unwrap();
                    assert!(a.difference(b.shape()) > tolerance, "duplicate objects in layer {}", layer.depth());
                }
            }
        }
    }
}

#[test]
fn setting_the_same_level_twice_changes_nothing() {
    let (mut graph, _) =
        LayerCollection::with_seeds(config(0), relic_core::default_generators(), &triangle()).unwrap();

    graph.set_inception_level(3).unwrap();
    let stats = graph.stats();
    let objects = graph.get_all_objects();

    let report = graph.set_inception_level(3).unwrap();
    assert!(report.is_empty());
    assert_eq!(graph.stats(), stats);
    assert_eq!(graph.get_all_objects(), objects);
}

#[test]
fn rebuilding_depth_gives_the_same_shape() {
    let mut generators = GeneratorSet::new();
    generators.register(MidpointGenerator);
    let (mut graph, _) = LayerCollection::with_seeds(config(0), generators, &triangle()).unwrap();

    graph.set_inception_level(5).unwrap();
    let first = graph.stats();
    assert_eq!(first.len(), 6);
    assert!(first.iter().all(|s| s.count_of(ObjectKind::Point) == 3));

    graph.set_inception_level(0).unwrap();
    assert_eq!(graph.object_count(), 3);
    graph.set_inception_level(5).unwrap();
    assert_eq!(graph.stats(), first);
    assert_invariants(&graph);
}

#[test]
fn rebuilding_depth_with_builtin_generators() {
    let (mut graph, _) =
        LayerCollection::with_seeds(config(3), relic_core::default_generators(), &triangle()).unwrap();
    let first = graph.stats();
    let count = graph.object_count();
    assert_invariants(&graph);

    graph.set_inception_level(0).unwrap();
    graph.set_inception_level(3).unwrap();
    assert_eq!(graph.stats(), first);
    assert_eq!(graph.object_count(), count);
    assert_invariants(&graph);
}

#[test]
fn invariants_hold_after_mutations() {
    let (mut graph, _) =
        LayerCollection::with_seeds(config(3), relic_core::default_generators(), &triangle()).unwrap();

    let seeds: Vec<ObjectId> = graph.layer(0).unwrap().collection().iter().collect();
    graph.set_time(seeds[0], 5.0).unwrap();
    assert_invariants(&graph);

    graph.set_relevancy(seeds[1], 0.3).unwrap();
    assert_invariants(&graph);

    graph.set_selected(seeds[2], true).unwrap();
    assert_invariants(&graph);

    let derived = graph.layer(2).unwrap().collection().iter().next().unwrap();
    graph.set_locked(derived, true).unwrap();
    graph.set_time(seeds[1], -3.0).unwrap();
    assert_invariants(&graph);

    let disposed = graph.dispose(seeds[1]);
    assert!(disposed > 1);
    assert!(!graph.contains(seeds[1]));
    assert!(graph.contains(derived));
    assert_invariants(&graph);

    let report = graph.seed(&[SeedRecord::point(4, 0.5, -60.0, 35.0)]);
    assert!(report.created > 0);
    assert_invariants(&graph);
}

#[test]
fn reseeding_keeps_invariants() {
    let (mut graph, _) =
        LayerCollection::with_seeds(config(2), relic_core::default_generators(), &triangle()).unwrap();

    let mut seeds = triangle();
    seeds[0].time = 8.0;
    seeds[2].position = Point2::new(40.0, 90.0);
    seeds.push(SeedRecord::point(5, 3.0, 70.0, 60.0));
    graph.reseed(&seeds);
    assert_invariants(&graph);
    assert_eq!(graph.locked_seeds().len(), 4);

    // 相同的种子再载入一次不会产生变化
    let stats = graph.stats();
    let report = graph.reseed(&seeds);
    assert_eq!(report.created, 0);
    assert_eq!(report.disposed, 0);
    assert_eq!(graph.stats(), stats);
}

/// 在第一个输入位于原点时 panic
struct FragileGenerator;

impl Generator for FragileGenerator {
    fn name(&self) -> &str {
        "Fragile"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point, ObjectKind::Point]
    }

    fn apply(&self, inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        if inputs[0].shape().anchor() == Point2::origin() {
            panic!("input at origin");
        }
        Ok(vec![Shape::Point(RelevantPoint::from_point2(inputs[1].shape().anchor()))])
    }
}

/// 总是返回非有限坐标
struct NanGenerator;

impl Generator for NanGenerator {
    fn name(&self) -> &str {
        "Not a number"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point]
    }

    fn apply(&self, _inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        Ok(vec![Shape::Point(RelevantPoint::new(f64::NAN, 0.0))])
    }
}

/// 总是报告退化输入
struct RefusingGenerator;

impl Generator for RefusingGenerator {
    fn name(&self) -> &str {
        "Refusing"
    }

    fn roles(&self) -> &[ObjectKind] {
        &[ObjectKind::Point]
    }

    fn apply(&self, _inputs: &[&RelevantObject]) -> Result<Vec<Shape>, GeneratorFault> {
        Err(GeneratorFault::Degenerate("always".to_string()))
    }
}

#[test]
fn generator_faults_are_isolated() {
    let mut generators = GeneratorSet::new();
    generators.register(FragileGenerator);
    generators.register(NanGenerator);
    generators.register(RefusingGenerator);
    generators.register(MidpointGenerator);

    let (graph, report) = LayerCollection::with_seeds(config(1), generators, &triangle()).unwrap();

    // Fragile：以原点开头的 2 个组合 panic；NaN 与 Refusing 各 3 次
    assert_eq!(report.faults, 8);
    assert_eq!(graph.layer(1).unwrap().collection().count_of(ObjectKind::Point), 3 + 1);
    assert_invariants(&graph);
}

#[test]
fn candidates_within_tolerance_are_merged() {
    // 两对种子的中点相同
    let seeds = [
        SeedRecord::point(1, 0.0, 0.0, 0.0),
        SeedRecord::point(2, 1.0, 100.0, 100.0),
        SeedRecord::point(3, 2.0, 100.0, 0.0),
        SeedRecord::point(4, 3.0, 0.0, 100.0),
    ];
    let mut generators = GeneratorSet::new();
    generators.register(MidpointGenerator);
    let (mut graph, report) = LayerCollection::with_seeds(config(1), generators, &seeds).unwrap();

    assert_eq!(report.merged, 1);
    assert_eq!(graph.layer(1).unwrap().count(), 5);

    let center = graph
        .nearest(Point2::new(50.0, 50.0), KindMask::ALL, None)
        .unwrap();
    let center_object = graph.object(center).unwrap();
    assert_eq!(center_object.parent_objects().len(), 4);
    assert_eq!(center_object.parent_groups().len(), 2);
    assert!((center_object.time() - 1.5).abs() < 1e-9);
    assert_invariants(&graph);

    // 只失去其中一个父组合时保留
    let s1 = graph.layer(0).unwrap().collection().iter().next().unwrap();
    graph.dispose(s1);
    assert!(graph.contains(center));
    assert_eq!(graph.object(center).unwrap().parent_objects().len(), 2);
    assert!((graph.object(center).unwrap().time() - 2.5).abs() < 1e-9);
    assert_invariants(&graph);
}

#[test]
fn non_finite_seed_times_are_skipped() {
    let mut seeds = triangle();
    seeds.push(SeedRecord::point(4, 3.0, 60.0, 20.0));
    seeds.push(SeedRecord::point(5, f64::NAN, 10.0, 90.0));

    let mut generators = GeneratorSet::new();
    generators.register(MidpointGenerator);
    let (graph, report) = LayerCollection::with_seeds(config(1), generators, &seeds).unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(graph.layer(0).unwrap().count(), 4);
    assert_eq!(graph.layer(1).unwrap().count(), 6);
    assert!(graph.arena().iter().all(|o| o.time().is_finite()));
    assert_invariants(&graph);
}

#[test]
fn invalid_configuration_is_rejected() {
    let bad = EngineConfig {
        acceptable_difference: -0.5,
        ..Default::default()
    };
    assert!(matches!(
        LayerCollection::new(bad, GeneratorSet::new()),
        Err(EngineError::Configuration(ConfigurationError::InvalidAcceptableDifference(_)))
    ));

    let mut generators = GeneratorSet::new();
    let malformed = GeneratorSettings {
        role_predicates: vec![SelectionPredicateCollection::from_predicates([
            SelectionPredicate::default().with_min_relevancy(2.0),
        ])],
        ..Default::default()
    };
    assert!(matches!(
        generators.register_with(MidpointGenerator, malformed),
        Err(ConfigurationError::MalformedPredicate { .. })
    ));
    assert!(generators.is_empty());
}
