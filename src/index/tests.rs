use super::*;

fn sample_vectors() -> Vec<Embedding> {
    vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 2.0],
        vec![3.0, 3.0],
    ]
}

#[test]
fn empty_input_builds_no_index() {
    let index = FlatL2Index::build(&[]).expect("empty input is not an error");
    assert!(index.is_none());
}

#[test]
fn build_records_shape() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    assert_eq!(index.len(), 4);
    assert_eq!(index.dimension(), 2);
    assert!(!index.is_empty());
}

#[test]
fn inconsistent_dimensions_are_rejected() {
    let vectors = vec![vec![0.0, 0.0], vec![1.0, 0.0, 5.0]];
    let err = FlatL2Index::build(&vectors).expect_err("should reject ragged input");
    assert_eq!(
        err,
        IndexError::InconsistentDimension {
            position: 1,
            expected: 2,
            actual: 3,
        }
    );
}

#[test]
fn zero_dimension_is_rejected() {
    let err = FlatL2Index::build(&[Vec::new()]).expect_err("should reject empty vectors");
    assert_eq!(err, IndexError::ZeroDimension);
}

#[test]
fn search_orders_by_ascending_distance() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    let neighbors = index.search(&[0.9, 0.1], 3).expect("should search");

    let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
    assert_eq!(positions, vec![1, 0, 2]);
    assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!((neighbors[0].distance - 0.02).abs() < 1e-6);
}

#[test]
fn search_returns_squared_distances() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    let neighbors = index.search(&[0.0, 0.0], 4).expect("should search");
    let distances: Vec<f32> = neighbors.iter().map(|n| n.distance).collect();
    assert_eq!(distances, vec![0.0, 1.0, 4.0, 18.0]);
}

#[test]
fn k_larger_than_index_returns_everything() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    let neighbors = index.search(&[0.0, 0.0], 50).expect("should search");
    assert_eq!(neighbors.len(), 4);
}

#[test]
fn zero_k_returns_nothing() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    assert!(index.search(&[0.0, 0.0], 0).expect("should search").is_empty());
}

#[test]
fn ties_break_by_position() {
    let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
    let index = FlatL2Index::build(&vectors)
        .expect("should build")
        .expect("index should exist");

    let neighbors = index.search(&[0.0, 0.0], 3).expect("should search");
    let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn query_dimension_mismatch_is_an_error() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    let err = index.search(&[0.0, 0.0, 0.0], 2).expect_err("should reject query");
    assert_eq!(
        err,
        IndexError::QueryDimension {
            expected: 2,
            actual: 3,
        }
    );
}

#[test]
fn search_where_only_considers_accepted_positions() {
    let index = FlatL2Index::build(&sample_vectors())
        .expect("should build")
        .expect("index should exist");

    let neighbors = index
        .search_where(&[0.0, 0.0], 2, |position| position >= 2)
        .expect("should search");

    let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
    assert_eq!(positions, vec![2, 3]);
}
