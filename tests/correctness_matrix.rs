use sqlgrade::grade::{
    CorrectnessMatrix, GradeError, Properties, PropertyLevel, PropertyOrder, PropertyState,
    SessionConfig, default_session,
};

fn triple(syntax: PropertyState, semantics: PropertyState, results: PropertyState) -> Properties {
    Properties::new(syntax, semantics, results)
}

#[test]
fn matrix_is_deterministic_for_every_order() {
    for order in PropertyOrder::ALL {
        let session = SessionConfig::builder().order(order).build();
        let first = CorrectnessMatrix::new(&session).expect("matrix");
        let second = CorrectnessMatrix::new(&session).expect("matrix");
        assert_eq!(first.entries(), second.entries());
        assert!(!first.is_empty());
    }
}

#[test]
fn levels_are_idempotent_and_normalized() {
    let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
    let best = triple(PropertyState::Correct, PropertyState::Correct, PropertyState::Correct);
    let worst = triple(
        PropertyState::Incorrect,
        PropertyState::Incorrect,
        PropertyState::Incorrect,
    );

    let (level, normalized) = matrix.calculate_correctness_level(best).expect("best");
    assert_eq!(level, matrix.len());
    assert_eq!(normalized, 1.0);
    assert_eq!(matrix.calculate_correctness_level(best), Ok((level, normalized)));

    assert_eq!(matrix.calculate_correctness_level(worst), Ok((1, 0.0)));
}

#[test]
fn default_matrix_excludes_implausible_triples() {
    use PropertyState::*;
    let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
    let entries = matrix.entries();

    assert!(!entries.contains(&triple(Correct, MinorIncorrect, Incorrect)));
    assert!(!entries.contains(&triple(Incorrect, Correct, Correct)));
    assert!(!entries.contains(&triple(Correct, Incorrect, Correct)));
    assert!(!entries.contains(&triple(Correct, MinorIncorrect, MinorIncorrect)));
    assert!(entries.contains(&triple(MinorIncorrect, Correct, Correct)));
    assert!(entries.contains(&triple(Correct, Incorrect, Incorrect)));
}

#[test]
fn results_first_order_ranks_results_above_everything() {
    use PropertyState::*;
    let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
    let (wrong_output, _) = matrix
        .calculate_correctness_level(triple(Correct, Incorrect, Incorrect))
        .expect("present");
    let (close_output, _) = matrix
        .calculate_correctness_level(triple(MinorIncorrect, Incorrect, MinorIncorrect))
        .expect("present");
    assert!(close_output > wrong_output);
}

#[test]
fn six_level_semantics_adds_partial_credit_rows() {
    use PropertyState::*;
    let session = SessionConfig::builder()
        .semantics_level(PropertyLevel::SixLevels)
        .build();
    let matrix = CorrectnessMatrix::new(&session).expect("matrix");
    let entries = matrix.entries();

    assert!(entries.contains(&triple(Correct, Sm3, Incorrect)));
    assert!(!entries.contains(&triple(Correct, Sm3, Correct)));
    assert!(!entries.contains(&triple(Incorrect, Sm1, Incorrect)));
}

#[test]
fn observed_triple_outside_matrix_is_a_consistency_error() {
    let matrix = CorrectnessMatrix::new(&default_session()).expect("matrix");
    let observed = triple(
        PropertyState::Invalid,
        PropertyState::Correct,
        PropertyState::Correct,
    );
    assert_eq!(
        matrix.calculate_correctness_level(observed),
        Err(GradeError::Consistency {
            syntax:    PropertyState::Invalid,
            semantics: PropertyState::Correct,
            results:   PropertyState::Correct,
        })
    );
}
