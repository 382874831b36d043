use proptest::prelude::*;
use sparse_output::backprop;
use sparse_output::ops::dispatch::{is_mode_active, mode_depth};
use sparse_output::ops::{self, OpOptions, Operator};
use sparse_output::sparse::Coo64;
use sparse_output::tensors::{Tensor, WithGrad};
use sparse_output::{Error, Layout, Operand, assert_approx_eq, sparse_output, sparse_output_call, tensor};

fn random_vector(n: usize) -> Tensor<f64> {
    Tensor::new(vec![n], (0..n).map(|_| rand::random::<f64>() * 2.0 - 1.0).collect())
}

fn diag_of(x: &Tensor<f64>) -> Operand {
    ops::diag(&Operand::Dense(x.clone())).unwrap()
}

#[test]
fn test_mul_of_diagonals_is_sparse_diagonal() {
    let x = random_vector(3);
    let y = random_vector(3);

    let r = sparse_output(|| ops::mul(&diag_of(&x), &diag_of(&y))).unwrap();

    let xy: Vec<f64> = x.data.iter().zip(&y.data).map(|(a, b)| a * b).collect();
    let expected = Coo64::new(vec![vec![0, 1, 2], vec![0, 1, 2]], xy, vec![3, 3]).unwrap();
    assert_eq!(r.layout(), Layout::SparseCoo);
    assert_eq!(r, Operand::Sparse(expected.clone()));
    assert_approx_eq!(r, Operand::Sparse(expected));
}

#[test]
fn test_mul_matches_inferred_shape_constructor() {
    let x = tensor!([1.5, -2.0, 0.25]);
    let y = tensor!([2.0, 3.0, -4.0]);

    let r = sparse_output(|| ops::mul(&diag_of(&x), &diag_of(&y))).unwrap();

    let expected = Coo64::with_inferred_shape(vec![vec![0, 1, 2], vec![0, 1, 2]], vec![3.0, -6.0, -1.0]).unwrap();
    let coo = r.as_sparse().unwrap();
    assert_eq!(coo.indices(), expected.indices());
    assert_eq!(coo.values(), expected.values());
    assert_eq!(coo, &expected);
}

#[test]
fn test_direct_call_form() {
    let a: Operand = tensor!([[0.0, 2.0], [1.0, 0.0]]).into();
    let b: Operand = tensor!([[5.0, 3.0], [0.0, 7.0]]).into();

    let r = sparse_output_call(Operator::Mul, &[a, b], &OpOptions::default()).unwrap();

    let coo = r.as_sparse().unwrap();
    assert_eq!(coo.nnz(), 1);
    assert_eq!(coo.coordinate(0), vec![0, 1]);
    assert_eq!(coo.values(), &[6.0]);
}

#[test]
fn test_sparse_result_densifies_to_plain_product() {
    let a: Operand = random_vector(16).into();
    let b: Operand = random_vector(16).into();

    let plain = ops::mul(&a, &b).unwrap();
    let intercepted = sparse_output(|| ops::mul(&a, &b)).unwrap();

    assert!(!plain.is_sparse());
    assert!(intercepted.is_sparse());
    assert_eq!(intercepted.to_dense(), plain.to_dense());
}

#[test]
fn test_other_operators_pass_through() {
    let v: Operand = tensor!([1.0, -2.0, 0.0]).into();
    let w: Operand = tensor!([0.5, 4.0, -3.0]).into();
    let m: Operand = tensor!([[1.0, 2.0], [3.0, 4.0]]).into();
    let sparse_v = ops::to_sparse(&v).unwrap();

    let cases: Vec<(Operator, Vec<Operand>, OpOptions)> = vec![
        (Operator::Add, vec![v.clone(), w.clone()], OpOptions::default()),
        (Operator::Add, vec![v.clone(), w.clone()], OpOptions::alpha(2.0)),
        (Operator::Sub, vec![v.clone(), w.clone()], OpOptions::default()),
        (Operator::Neg, vec![v.clone()], OpOptions::default()),
        (Operator::Matmul, vec![m.clone(), m.clone()], OpOptions::default()),
        (Operator::Relu, vec![v.clone()], OpOptions::default()),
        (Operator::Sum, vec![w.clone()], OpOptions::default()),
        (Operator::Diag, vec![v.clone()], OpOptions::default()),
        (Operator::ToSparse, vec![v.clone()], OpOptions::default()),
        (Operator::ToDense, vec![sparse_v.clone()], OpOptions::default()),
        (Operator::Neg, vec![sparse_v], OpOptions::default()),
    ];

    for op in Operator::ALL.into_iter().filter(|&op| op != Operator::Mul) {
        assert!(cases.iter().any(|(c, _, _)| *c == op), "{op} has no pass-through case");
    }

    for (op, args, options) in cases {
        let outside = ops::dispatch::call(op, &args, &options).unwrap();
        let inside = sparse_output_call(op, &args, &options).unwrap();
        assert_eq!(outside.layout(), inside.layout(), "{op} changed layout");
        assert_eq!(outside, inside, "{op} changed value");
    }
}

#[test]
fn test_errors_propagate_and_mode_is_released() {
    let a: Operand = tensor!([1.0, 2.0]).into();
    let b: Operand = tensor!([1.0, 2.0, 3.0]).into();

    let err = sparse_output(|| {
        assert!(is_mode_active());
        ops::mul(&a, &b)
    })
    .unwrap_err();

    assert_eq!(err, Error::ShapeMismatch { expected: vec![2], got: vec![3] });
    assert!(!is_mode_active());
}

#[test]
fn test_mode_is_released_after_panic() {
    let result = std::panic::catch_unwind(|| {
        sparse_output(|| {
            assert_eq!(mode_depth(), 1);
            panic!("boom");
        })
    });
    assert!(result.is_err());
    assert_eq!(mode_depth(), 0);

    let a: Operand = tensor!([2.0]).into();
    assert!(!ops::mul(&a, &a).unwrap().is_sparse());
}

#[test]
fn test_every_product_in_the_closure_is_intercepted() {
    let a: Operand = tensor!([1.0, 0.0, 3.0]).into();
    let b: Operand = tensor!([2.0, 5.0, 1.0]).into();

    let (first, second, total) = sparse_output(|| -> Result<_, Error> {
        let first = ops::mul(&a, &b)?;
        let second = ops::mul(&first, &first)?;
        let total = ops::sum(&second)?;
        Ok((first, second, total))
    })
    .unwrap();

    assert!(first.is_sparse());
    // sparse × sparse runs the sparse kernel, then gets sparsified again
    assert!(second.is_sparse());
    assert_eq!(second.to_dense(), tensor!([4.0, 0.0, 9.0]));
    assert_eq!(total, Operand::Dense(Tensor::scalar(13.0)));
}

#[test]
fn test_nested_sparse_output_unwinds_in_order() {
    sparse_output(|| {
        assert_eq!(mode_depth(), 1);
        sparse_output(|| assert_eq!(mode_depth(), 2));
        assert_eq!(mode_depth(), 1);
    });
    assert_eq!(mode_depth(), 0);
}

// Backpropagating through the sparse product needs a sparse × dense multiply,
// which the default kernels do not provide. This guards that it still fails
// loudly rather than silently producing something.
#[test]
fn test_backward_through_sparse_product_is_unsupported() {
    let x = WithGrad::new(random_vector(3));
    let y = WithGrad::new(random_vector(3));
    let (dx, dy) = (
        WithGrad::new(diag_of(&x.value).to_dense()),
        WithGrad::new(diag_of(&y.value).to_dense()),
    );

    let (r, back) = sparse_output(|| backprop::mul(&dx, &dy)).unwrap();
    assert!(r.is_sparse());

    let (_, sum_back) = backprop::sum(&r).unwrap();
    let grad = sum_back(1.0);
    assert!(grad.is_sparse());

    let err = back(&grad).unwrap_err();
    assert_eq!(
        err,
        Error::UnsupportedLayout {
            op: Operator::Mul,
            layouts: vec![Layout::SparseCoo, Layout::Strided],
        }
    );
}

#[test]
fn test_backward_through_dense_product_still_works() {
    let mut a = WithGrad::new(tensor!([1.0, 2.0]));
    let b = WithGrad::new(tensor!([3.0, 4.0]));

    let (out, back) = backprop::mul(&a, &b).unwrap();
    let (total, sum_back) = backprop::sum(&out).unwrap();
    assert_eq!(total, 11.0);

    let (grad_a, _) = back(&sum_back(1.0)).unwrap();
    backprop::accumulate(&mut a, &grad_a).unwrap();
    assert_eq!(a.grad, tensor!([3.0, 4.0]));

    let sparse_grad = ops::to_sparse(&grad_a).unwrap();
    assert!(matches!(
        backprop::accumulate(&mut a, &sparse_grad),
        Err(Error::UnsupportedLayout { op: Operator::Add, .. })
    ));
}

fn nonzero() -> impl Strategy<Value = f64> {
    (0.1f64..10.0, any::<bool>()).prop_map(|(v, negative)| if negative { -v } else { v })
}

proptest! {
    #[test]
    fn prop_diagonal_product_is_sparse_diagonal(
        pairs in prop::collection::vec((nonzero(), nonzero()), 1..8),
    ) {
        let n = pairs.len();
        let x = Tensor::new(vec![n], pairs.iter().map(|p| p.0).collect());
        let y = Tensor::new(vec![n], pairs.iter().map(|p| p.1).collect());

        let r = sparse_output(|| ops::mul(&diag_of(&x), &diag_of(&y))).unwrap();
        let coo = r.as_sparse().unwrap();

        let diagonal: Vec<usize> = (0..n).collect();
        prop_assert_eq!(coo.shape(), &[n, n][..]);
        prop_assert_eq!(coo.indices(), &[diagonal.clone(), diagonal][..]);
        for (i, (a, b)) in pairs.iter().enumerate() {
            prop_assert_eq!(coo.values()[i], a * b);
        }
    }

    #[test]
    fn prop_sparse_product_densifies_to_dense_product(
        values in prop::collection::vec((-5.0f64..5.0, -5.0f64..5.0), 1..32),
    ) {
        let n = values.len();
        let a: Operand = Tensor::new(vec![n], values.iter().map(|v| v.0).collect()).into();
        let b: Operand = Tensor::new(vec![n], values.iter().map(|v| v.1).collect()).into();

        let plain = ops::mul(&a, &b).unwrap();
        let intercepted = sparse_output(|| ops::mul(&a, &b)).unwrap();
        prop_assert!(intercepted.is_sparse());
        prop_assert_eq!(intercepted.to_dense(), plain.to_dense());
    }
}
