//! End-to-end runs of the distributed engine over the in-process
//! transport, at every supported group size and in both directions.

use ferrosort::{Communicator, Direction, Error, Settings, engine, local, sort};
use rand::Rng;

/// Run a full sort of `input` over a group of `p` workers and return the
/// coordinator's result.
fn sort_with_group(p: usize, direction: Direction, input: Vec<i32>) -> Vec<i32> {
    let results = local::spawn_group(p, move |comm| {
        let settings = Settings::new(direction, input.len());
        let buffer = (comm.rank() == 0).then(|| input.clone());
        engine::run(comm, settings, buffer).unwrap()
    });

    let mut sorted = None;
    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Some(buffer) => {
                assert_eq!(rank, 0, "only the coordinator may hold the result");
                sorted = Some(buffer);
            }
            None => assert_ne!(rank, 0, "the coordinator must hold the result"),
        }
    }
    sorted.expect("coordinator result")
}

fn random_input(len: usize) -> Vec<i32> {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| rng.gen_range(-10_000..10_000)).collect()
}

#[test]
fn every_group_size_sorts_ascending() {
    for p in [1, 2, 4, 8] {
        let input = random_input(64);
        let mut expected = input.clone();
        expected.sort_unstable();

        let sorted = sort_with_group(p, Direction::Ascending, input);
        assert_eq!(sorted, expected, "group size {p}");
    }
}

#[test]
fn every_group_size_sorts_descending() {
    for p in [1, 2, 4, 8] {
        let input = random_input(64);
        let mut expected = input.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));

        let sorted = sort_with_group(p, Direction::Descending, input);
        assert_eq!(sorted, expected, "group size {p}");
    }
}

#[test]
fn eight_distinct_integers_across_four_workers() {
    let sorted = sort_with_group(4, Direction::Ascending, vec![5, 3, 8, 1, 9, 2, 7, 6]);
    assert_eq!(sorted, vec![1, 2, 3, 5, 6, 7, 8, 9]);
}

#[test]
fn chunk_of_one_element_per_worker() {
    let sorted = sort_with_group(8, Direction::Ascending, vec![8, 6, 7, 5, 3, 0, 9, 4]);
    assert_eq!(sorted, vec![0, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn already_sorted_input_is_returned_unchanged() {
    let input: Vec<i32> = (0..128).collect();
    let sorted = sort_with_group(4, Direction::Ascending, input.clone());
    assert_eq!(sorted, input);

    let reversed: Vec<i32> = (0..128).rev().collect();
    let sorted = sort_with_group(4, Direction::Descending, reversed.clone());
    assert_eq!(sorted, reversed);
}

#[test]
fn duplicates_survive_as_a_permutation() {
    let input = vec![3, 3, 3, 1, 1, 2, 2, 2, 0, 0, 3, 1, 2, 0, 1, 0];
    let mut expected = input.clone();
    expected.sort_unstable();

    let sorted = sort_with_group(4, Direction::Ascending, input);
    assert_eq!(sorted, expected);
    assert!(sort::is_ordered(&sorted, Direction::Ascending));
}

#[test]
fn single_worker_matches_full_group() {
    let input = random_input(256);
    let solo = sort_with_group(1, Direction::Ascending, input.clone());
    let eight = sort_with_group(8, Direction::Ascending, input);
    assert_eq!(solo, eight);
}

#[test]
fn three_workers_are_rejected_before_any_exchange() {
    let outcomes = local::spawn_group(3, |comm| {
        let buffer = (comm.rank() == 0).then(|| vec![0i32; 64]);
        engine::run(comm, Settings::new(Direction::Ascending, 64), buffer)
    });
    for outcome in outcomes {
        assert!(matches!(outcome, Err(Error::Config(_))));
    }
}

#[test]
fn non_power_of_two_length_is_rejected_upfront() {
    let outcomes = local::spawn_group(4, |comm| {
        let buffer = (comm.rank() == 0).then(|| vec![0i32; 100]);
        engine::run(comm, Settings::new(Direction::Ascending, 100), buffer)
    });
    for outcome in outcomes {
        assert!(matches!(outcome, Err(Error::Config(_))));
    }
}

#[test]
fn length_smaller_than_group_is_rejected_upfront() {
    let outcomes = local::spawn_group(8, |comm| {
        let buffer = (comm.rank() == 0).then(|| vec![0i32; 4]);
        engine::run(comm, Settings::new(Direction::Ascending, 4), buffer)
    });
    for outcome in outcomes {
        assert!(matches!(outcome, Err(Error::Config(_))));
    }
}

#[test]
fn settings_travel_through_the_exchange() {
    let path = std::env::temp_dir().join(format!(
        "ferrosort-exchange-test-{}.bin",
        std::process::id()
    ));
    let mut bytes = (8i32).to_ne_bytes().to_vec();
    for v in [5i32, 3, 8, 1, 9, 2, 7, 6] {
        bytes.extend_from_slice(&v.to_ne_bytes());
    }
    std::fs::write(&path, bytes).unwrap();

    let file = path.clone();
    let results = local::spawn_group(2, move |comm| {
        let root = comm.rank() == 0;
        let (settings, buffer) =
            engine::exchange_settings(&comm, Direction::Descending, root.then(|| file.as_path()))
                .unwrap();
        assert_eq!(buffer.is_some(), root);
        engine::run(comm, settings, buffer).unwrap()
    });
    std::fs::remove_file(&path).ok();

    assert_eq!(results[0].as_deref(), Some(&[9, 8, 7, 6, 5, 3, 2, 1][..]));
    assert_eq!(results[1], None);
}

#[test]
fn larger_randomized_run() {
    let input = random_input(1 << 12);
    let mut expected = input.clone();
    expected.sort_unstable();

    let sorted = sort_with_group(8, Direction::Ascending, input);
    assert_eq!(sorted, expected);
}
