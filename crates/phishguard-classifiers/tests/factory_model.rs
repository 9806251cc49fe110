use ndarray::Array2;
use phishguard_classifiers::config::{ModelKind, ModelSpec};
use phishguard_classifiers::models::{build_model, ClassifierModel};

#[test]
fn test_factory_builds_and_predicts() {
    // tiny dataset
    let x = Array2::from_shape_vec(
        (6, 2),
        vec![
            1.0, 0.0, // class 1
            0.0, 1.0, // class 0
            1.0, 0.1, // class 1
            0.0, 0.9, // class 0
            1.1, 0.0, // class 1
            0.0, 1.2, // class 0
        ],
    )
    .expect("failed to create feature matrix");
    let y = vec![1usize, 0, 1, 0, 1, 0];

    for kind in [
        ModelKind::LogisticRegression,
        ModelKind::GaussianNb,
        ModelKind::MultinomialNb,
        ModelKind::BernoulliNb,
        ModelKind::GradientBoostedTrees,
    ] {
        let mut model = build_model(&ModelSpec::new(kind));
        model.fit(&x, &y).expect("fit failed");
        let predictions = model.predict(&x).expect("predict failed");
        assert_eq!(predictions.len(), x.nrows(), "{}", kind);
        assert_eq!(model.kind(), kind);
    }
}
