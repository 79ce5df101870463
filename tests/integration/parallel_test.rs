use climate_analyzer::utils::parallel::{
    MAX_WORKERS, ProgressTracker, chunked_parallel_map, get_optimal_workers, parallel_map,
};

#[test]
fn test_results_keep_input_order() {
    let items: Vec<u64> = (0..200).collect();
    let results = parallel_map(|x| Ok(x * x), &items, Some(4)).unwrap();

    assert_eq!(results.len(), 200);
    for (i, task) in results.iter().enumerate() {
        assert_eq!(task.index, i);
        assert_eq!(task.result, Ok((i * i) as u64));
    }
}

#[test]
fn test_errors_and_panics_are_recorded() {
    let items = vec![1, 2, 3, 4];
    let results = parallel_map(
        |x: &i32| {
            if *x == 2 {
                anyhow::bail!("bad item {x}");
            }
            if *x == 3 {
                panic!("boom");
            }
            Ok(x * 10)
        },
        &items,
        Some(2),
    )
    .unwrap();

    assert!(results[0].is_success());
    assert_eq!(results[1].result, Err("bad item 2".to_string()));
    assert_eq!(results[2].result, Err("boom".to_string()));
    assert_eq!(results[3].result, Ok(40));

    let mut tracker = ProgressTracker::new(results.len());
    for task in &results {
        tracker.update(task.is_success());
    }
    assert_eq!(tracker.failed, 2);
    assert_eq!(tracker.to_string(), "Progress: 4/4 (100.0%)");
}

#[test]
fn test_chunked_map_flattens() {
    let items: Vec<f64> = (0..25).map(f64::from).collect();
    let doubled: Vec<f64> = chunked_parallel_map(
        |chunk: &[f64]| Ok(chunk.iter().map(|x| x * 2.0).collect()),
        &items,
        10,
        None,
    )
    .unwrap();
    assert_eq!(doubled.len(), 25);
    assert_eq!(doubled[24], 48.0);

    let partial: Vec<f64> = chunked_parallel_map(
        |chunk: &[f64]| {
            if chunk[0] == 10.0 {
                anyhow::bail!("skip");
            }
            Ok(chunk.to_vec())
        },
        &items,
        10,
        Some(2),
    )
    .unwrap();
    assert_eq!(partial.len(), 15);
}

#[test]
fn test_worker_count_bounds() {
    let workers = get_optimal_workers();
    assert!((1..=MAX_WORKERS).contains(&workers));
    assert_eq!(ProgressTracker::new(0).progress(), 0.0);
}
