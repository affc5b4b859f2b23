use tessera::quadrature_data::QuadratureData;

#[test]
fn slots_are_element_major() {
    let data = QuadratureData::new(3, 4, 0.5);
    assert_eq!(data.num_elements(), 3);
    assert_eq!(data.points_per_element(), 4);
    assert_eq!(data.len(), 12);
    assert!(!data.is_empty());
    assert_eq!(data.get(2, 3), 0.5);
    assert_eq!(data.read().len(), 12);

    data.fill(1.5);
    assert!(data.read().iter().all(|&s| s == 1.5));
}

#[test]
fn clones_share_state() {
    let data = QuadratureData::new(2, 2, vec![0usize]);
    let handle = data.clone();
    data.fill(vec![1, 2]);
    assert_eq!(handle.get(1, 1), vec![1, 2]);
    assert_eq!(handle.len(), data.len());
}

#[test]
fn empty_data() {
    let data = QuadratureData::new(0, 8, ());
    assert!(data.is_empty());
    assert_eq!(data.read().len(), 0);
}
