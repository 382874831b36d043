use sparse_output::backend::{Backend, PARALLEL_THRESHOLD, get_backend, set_backend};
use sparse_output::ops;
use sparse_output::sparse::SparseCoo;
use sparse_output::tensors::{Tensor, WithGrad};
use sparse_output::{Operand, tensor};

#[test]
fn test_tensor_creation() {
    let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(t.ndim(), 2);
    assert_eq!(t.numel(), 4);
}

#[test]
fn test_tensor_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_tensor_macro() {
    let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);

    let s = tensor!(5.0);
    assert_eq!(s, Tensor::scalar(5.0));
}

#[test]
fn test_with_grad_starts_at_zero() {
    let w = WithGrad::new(tensor!([[1.0, 2.0, 3.0]]));
    assert_eq!(w.grad, Tensor::zeros(vec![1, 3]));
}

#[test]
fn test_matmul() {
    let a: Operand = Tensor::new(vec![2, 3], vec![
        1.0, 2.0, 3.0,
        4.0, 5.0, 6.0,
    ]).into();
    let b: Operand = Tensor::new(vec![3, 2], vec![
        7.0, 8.0,
        9.0, 10.0,
        11.0, 12.0,
    ]).into();

    let output = ops::matmul(&a, &b).unwrap();
    assert_eq!(output.shape(), &[2, 2]);
    assert_eq!(output, Operand::Dense(tensor!([[58.0, 64.0], [139.0, 154.0]])));
}

#[test]
fn test_relu() {
    let t: Operand = Tensor::new(vec![3], vec![-1.0, 0.0, 1.0]).into();
    let output = ops::relu(&t).unwrap();
    assert_eq!(output.to_dense().data, vec![0.0, 0.0, 1.0]);
}

#[test]
fn test_add_with_alpha() {
    let a: Operand = tensor!([1.0, 2.0]).into();
    let b: Operand = tensor!([10.0, 20.0]).into();
    assert_eq!(ops::add_scaled(&a, &b, 0.5).unwrap(), Operand::Dense(tensor!([6.0, 12.0])));
    assert_eq!(ops::sub(&b, &a).unwrap(), Operand::Dense(tensor!([9.0, 18.0])));
}

#[test]
fn test_sparse_round_trip_through_ops() {
    let dense = tensor!([[0.0, 0.0, 7.0], [1.0, 0.0, 0.0]]);
    let sparse = ops::to_sparse(&dense.clone().into()).unwrap();

    let coo = sparse.as_sparse().unwrap();
    assert_eq!(coo.nnz(), 2);
    assert_eq!(coo, &SparseCoo::from_dense(&dense));
    assert_eq!(ops::to_dense(&sparse).unwrap(), Operand::Dense(dense));
}

#[test]
fn test_backend_does_not_change_results() {
    let n = PARALLEL_THRESHOLD + 3;
    let a: Operand = Tensor::new(vec![n], (0..n).map(|i| i as f64 - 100.0).collect()).into();
    let b: Operand = Tensor::new(vec![n], (0..n).map(|i| (i % 7) as f64).collect()).into();

    let before = get_backend();
    set_backend(Backend::Serial);
    let serial = (ops::mul(&a, &b).unwrap(), ops::relu(&a).unwrap());
    set_backend(Backend::Parallel);
    let parallel = (ops::mul(&a, &b).unwrap(), ops::relu(&a).unwrap());
    set_backend(before);

    assert_eq!(serial, parallel);
}
