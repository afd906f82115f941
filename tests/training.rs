use discrete_hmm::{log_sum_exp, DiscreteHmm, Estimator, EstimatorOptions, HmmError, TrainingState};

fn runs_of_five() -> Vec<usize> {
    [[0; 5], [1; 5], [0; 5], [1; 5]].concat()
}

#[test]
fn autocorrelated_sequence_learns_sticky_transitions() {
    let opts = EstimatorOptions::default().with_max_iter(50);
    let mut est = Estimator::new(runs_of_five(), 2, 2, opts).unwrap();

    assert_eq!(est.train(), TrainingState::Converged);
    assert!(est.iterations() < 50, "took {} iterations", est.iterations());

    let a = est.transition();
    assert!(a[(0, 0)] > a[(0, 1)], "A = {:?}", a.to_rows());
    assert!(a[(1, 1)] > a[(1, 0)], "A = {:?}", a.to_rows());

    // each state specializes on one symbol
    let b = est.emission();
    for i in 0..2 {
        assert!(b[(i, 0)].max(b[(i, 1)]) > 0.99, "B = {:?}", b.to_rows());
    }
}

#[test]
fn short_alternating_pairs_hit_the_cap_without_error() {
    // The likelihood surface for this sequence has a long flat ridge, so EM is
    // still creeping upward after 50 iterations.
    let obs = vec![0, 0, 1, 1, 0, 0, 1, 1, 0, 0];
    let opts = EstimatorOptions::default().with_max_iter(50).with_seed(1);
    let mut est = Estimator::new(obs, 2, 2, opts).unwrap();

    assert_eq!(est.train(), TrainingState::MaxIterReached);
    assert_eq!(est.iterations(), 50);
    assert!(!est.converged());

    let history = est.log_likelihood_history();
    for pair in history.windows(2) {
        assert!(pair[1] - pair[0] >= -1e-7, "{} -> {}", pair[0], pair[1]);
    }
    assert!(history[49] > history[0] + 1.0);
    assert!(est.final_alpha().is_some());
    assert!(est.final_gamma().is_some());
}

#[test]
fn single_state_model_collapses() {
    let mut est = Estimator::new(vec![0, 1, 0], 1, 2, EstimatorOptions::default()).unwrap();
    assert_eq!(est.train(), TrainingState::Converged);

    assert_eq!(est.transition().to_rows(), vec![vec![1.0]]);
    assert_eq!(est.initial_probs(), &[1.0]);
    // first iteration fits B, the next two agree on the likelihood
    assert!(est.iterations() <= 3);
    assert!((est.emission()[(0, 0)] - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn out_of_range_symbol_is_rejected_at_construction() {
    for bad in [2, 3, 100] {
        let err = Estimator::new(vec![0, 1, bad, 0], 2, 2, EstimatorOptions::default()).unwrap_err();
        assert!(
            matches!(err, HmmError::SymbolOutOfRange { index: 2, .. }),
            "unexpected error: {err}"
        );
    }
}

#[test]
fn inference_reports_bad_sequences_as_errors() {
    let model = DiscreteHmm::new(
        vec![0.5, 0.5],
        vec![vec![0.8, 0.2], vec![0.3, 0.7]],
        vec![vec![0.9, 0.1], vec![0.2, 0.8]],
    )
    .unwrap();
    assert!(matches!(
        model.log_likelihood(&[0, 7]),
        Err(HmmError::SymbolOutOfRange { index: 1, symbol: 7, n_symbols: 2 })
    ));
    // symbol 2 would alias into the next emission row if it slipped through
    assert!(matches!(model.posteriors(&[2, 0, 1]), Err(HmmError::SymbolOutOfRange { index: 0, .. })));
    assert!(matches!(model.filter(&[]), Err(HmmError::SequenceTooShort { len: 0, min: 1 })));
    assert!(matches!(model.posteriors(&[]), Err(HmmError::SequenceTooShort { len: 0, .. })));
}

#[test]
fn identical_inputs_train_identically() {
    let obs: Vec<usize> = (0..200).map(|t| (t * t + 3 * t) % 7 % 3).collect();
    let opts = EstimatorOptions::default().with_seed(2024);

    let mut a = Estimator::new(obs.clone(), 3, 3, opts).unwrap();
    let mut b = Estimator::new(obs, 3, 3, opts).unwrap();
    a.train();
    b.train();

    let bits = |xs: &[f64]| xs.iter().map(|x| x.to_bits()).collect::<Vec<u64>>();
    assert_eq!(bits(a.transition().as_slice()), bits(b.transition().as_slice()));
    assert_eq!(bits(a.emission().as_slice()), bits(b.emission().as_slice()));
    assert_eq!(bits(a.initial_probs()), bits(b.initial_probs()));
    assert_eq!(bits(a.log_likelihood_history()), bits(b.log_likelihood_history()));
}

#[test]
fn final_artifacts_describe_updated_parameters() {
    let obs = runs_of_five();
    let mut est = Estimator::new(obs.clone(), 2, 2, EstimatorOptions::default()).unwrap();
    est.train();

    let gamma = est.final_gamma().unwrap();
    assert_eq!(gamma.rows(), obs.len());
    assert_eq!(gamma, &est.model().posteriors(&obs).unwrap());

    let alpha = est.final_alpha().unwrap();
    let last = alpha.row(alpha.rows() - 1);
    let ll_final = est.model().log_likelihood(&obs).unwrap();
    assert!((log_sum_exp(last) - ll_final).abs() < 1e-9);
    // one M-step past the last recorded likelihood
    assert!(ll_final >= *est.log_likelihood_history().last().unwrap() - 1e-7);
}

#[test]
fn long_sequence_trains_without_underflow() {
    let obs: Vec<usize> = (0..3_000).map(|t| if (t / 40) % 2 == 0 { t % 5 % 2 } else { 2 }).collect();
    let opts = EstimatorOptions::default().with_max_iter(20);
    let mut est = Estimator::new(obs, 2, 3, opts).unwrap();
    est.train();
    assert!(est.log_likelihood_history().iter().all(|ll| ll.is_finite()));
    assert!(est
        .final_alpha()
        .unwrap()
        .as_slice()
        .iter()
        .all(|v| v.is_finite()));
}

#[test]
fn callback_messages_and_indices() {
    let mut est = Estimator::new(runs_of_five(), 2, 2, EstimatorOptions::default()).unwrap();
    let mut seen = Vec::new();
    est.train_with_callback(|_, iteration, done| seen.push((iteration, done)));

    let n = est.iterations();
    let expected: Vec<(usize, bool)> = (0..n)
        .map(|k| (k, false))
        .chain(std::iter::once((n - 1, true)))
        .collect();
    assert_eq!(seen, expected);
}
