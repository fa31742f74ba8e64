use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, DictionaryArray, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Float64Type, Int32Type, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use modelframe_arrow::{
    CategoricalEncoding, DesignMatrix, EvalError, INTERCEPT_COLUMN, evaluate,
    schema_from_record_batch,
};
use modelframe_core::{DataTypeDef, FieldDef, Schema};
use modelframe_formula::{BoundFormula, Formula, parse_formula};

fn make_batch(columns: Vec<(&str, ArrayRef)>) -> RecordBatch {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, a)| a).collect();
    RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays).unwrap()
}

fn f64s(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

fn labels(values: Vec<Option<&str>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

fn bind(text: &str, schema: &Schema) -> BoundFormula {
    parse_formula(text).unwrap().bind(schema).unwrap()
}

fn column_values(x: &DesignMatrix, name: &str) -> Vec<f64> {
    x.column(name)
        .unwrap_or_else(|| panic!("missing column {name}"))
}

/// NaN-aware comparison for f64 vectors.
fn assert_same(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(
            (a.is_nan() && e.is_nan()) || (a - e).abs() < 1e-12,
            "{actual:?} vs {expected:?}"
        );
    }
}

fn iris_schema() -> Schema {
    Schema::new(vec![
        FieldDef::new(
            "class",
            DataTypeDef::categorical(["setosa", "versicolor", "virginica"]),
        ),
        FieldDef::new("sepallength", DataTypeDef::F64),
        FieldDef::new("sepalwidth", DataTypeDef::F64),
        FieldDef::new("petallength", DataTypeDef::F64),
        FieldDef::new("petalwidth", DataTypeDef::F64),
    ])
    .unwrap()
}

fn iris_batch() -> RecordBatch {
    make_batch(vec![
        (
            "class",
            labels(vec![Some("setosa"), Some("versicolor"), Some("virginica")]),
        ),
        ("sepallength", f64s(vec![Some(5.1), Some(7.0), Some(6.3)])),
        ("sepalwidth", f64s(vec![Some(3.5), Some(3.2), Some(3.3)])),
        ("petallength", f64s(vec![Some(1.4), Some(4.7), Some(6.0)])),
        ("petalwidth", f64s(vec![Some(0.2), Some(1.4), Some(2.5)])),
    ])
}

fn groups_schema() -> Schema {
    Schema::new(vec![
        FieldDef::new("y", DataTypeDef::F64),
        FieldDef::new("a", DataTypeDef::F64),
        FieldDef::new("g", DataTypeDef::categorical(["lo", "mid", "hi"])),
    ])
    .unwrap()
}

fn groups_batch() -> RecordBatch {
    make_batch(vec![
        ("y", f64s(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)])),
        ("a", f64s(vec![Some(2.0), Some(3.0), None, Some(5.0)])),
        (
            "g",
            labels(vec![Some("lo"), Some("hi"), Some("mid"), None]),
        ),
    ])
}

#[test]
fn iris_response_codes_and_numeric_design() {
    let bound = Formula::lhs("class").bind(&iris_schema()).unwrap();
    let batch = iris_batch();
    let eval = evaluate(&bound, &batch).unwrap();

    let y = eval.y().unwrap();
    let codes = y.as_primitive::<Int32Type>();
    assert_eq!(codes.values().to_vec(), vec![0, 1, 2]);

    let x = eval.x(CategoricalEncoding::Dummy);
    assert_eq!((x.nrows(), x.ncols()), (3, 4));
    assert_eq!(
        x.names(),
        &["sepallength", "sepalwidth", "petallength", "petalwidth"]
    );
    for (i, name) in x.names().iter().enumerate() {
        let expected = batch
            .column_by_name(name)
            .unwrap()
            .as_primitive::<Float64Type>()
            .values()
            .to_vec();
        assert_eq!(x.rows().map(|r| r[i]).collect::<Vec<_>>(), expected);
    }
}

#[test]
fn response_codes_follow_declared_levels_not_dictionary_order() {
    let dictionary = DictionaryArray::<Int32Type>::try_new(
        Int32Array::from(vec![0, 1, 1, 0]),
        Arc::new(StringArray::from(vec!["virginica", "setosa"])),
    )
    .unwrap();
    let batch = make_batch(vec![
        ("class", Arc::new(dictionary) as ArrayRef),
        ("sepallength", f64s(vec![Some(1.0); 4])),
    ]);
    let schema = Schema::new(vec![
        FieldDef::new(
            "class",
            DataTypeDef::categorical(["setosa", "versicolor", "virginica"]),
        ),
        FieldDef::new("sepallength", DataTypeDef::F64),
    ])
    .unwrap();
    let bound = bind("class ~ sepallength", &schema);

    let y = evaluate(&bound, &batch).unwrap().y().unwrap();
    assert_eq!(y.as_primitive::<Int32Type>().values().to_vec(), vec![2, 0, 0, 2]);
}

#[test]
fn categorical_encodings() {
    let bound = bind("~ g", &groups_schema());
    let batch = groups_batch();
    let eval = evaluate(&bound, &batch).unwrap();
    let nan = f64::NAN;

    let ordinal = eval.x(CategoricalEncoding::Ordinal);
    assert_eq!(ordinal.names(), &["g"]);
    assert_same(&column_values(&ordinal, "g"), &[0.0, 2.0, 1.0, nan]);

    let one_hot = eval.x(CategoricalEncoding::OneHot);
    assert_eq!(one_hot.names(), &["g_lo", "g_mid", "g_hi"]);
    assert_same(one_hot.row(0).unwrap(), &[1.0, 0.0, 0.0]);
    assert_same(one_hot.row(1).unwrap(), &[0.0, 0.0, 1.0]);
    assert_same(one_hot.row(3).unwrap(), &[nan, nan, nan]);

    let dummy = eval.x(CategoricalEncoding::Dummy);
    assert_eq!(dummy.names(), &["g_mid", "g_hi"]);
    assert_same(dummy.row(0).unwrap(), &[0.0, 0.0]);
    assert_same(dummy.row(2).unwrap(), &[1.0, 0.0]);
}

#[test]
fn unknown_labels_are_missing() {
    let bound = bind("y ~ g", &groups_schema());
    let batch = make_batch(vec![
        ("y", f64s(vec![Some(1.0), Some(2.0)])),
        ("g", labels(vec![Some("lo"), Some("extra")])),
    ]);
    let eval = evaluate(&bound, &batch).unwrap();
    let x = eval.x(CategoricalEncoding::OneHot);
    assert_same(x.row(1).unwrap(), &[f64::NAN, f64::NAN, f64::NAN]);
}

#[test]
fn missing_values_propagate_as_nan() {
    let schema = Schema::new(vec![
        FieldDef::new("y", DataTypeDef::F64),
        FieldDef::new("age", DataTypeDef::F64),
    ])
    .unwrap();
    let bound = bind("log(y) ~ log(age) + sqrt(age)", &schema);
    let batch = make_batch(vec![
        ("y", f64s(vec![Some(1.0), None, Some(std::f64::consts::E)])),
        ("age", f64s(vec![Some(1.0), None, Some(-4.0)])),
    ]);
    let eval = evaluate(&bound, &batch).unwrap();

    let y = eval.y().unwrap();
    assert_eq!(y.data_type(), &DataType::Float64);
    let y: Vec<f64> = y.as_primitive::<Float64Type>().values().to_vec();
    assert_same(&y, &[0.0, f64::NAN, 1.0]);

    let x = eval.x(CategoricalEncoding::Dummy);
    assert_same(&column_values(&x, "log(age)"), &[0.0, f64::NAN, f64::NAN]);
    assert_same(&column_values(&x, "sqrt(age)"), &[1.0, f64::NAN, f64::NAN]);
}

#[test]
fn missing_input_leaves_the_rest_of_the_row_intact() {
    let schema = Schema::new(vec![
        FieldDef::new("y", DataTypeDef::F64),
        FieldDef::new("age", DataTypeDef::F64),
        FieldDef::new("a", DataTypeDef::F64),
        FieldDef::new("g", DataTypeDef::categorical(["lo", "hi"])),
    ])
    .unwrap();
    let bound = bind("y ~ log(age) + a + g", &schema);
    let batch = make_batch(vec![
        ("y", f64s(vec![Some(1.0), Some(2.0), Some(3.0)])),
        ("age", f64s(vec![Some(1.0), None, Some(std::f64::consts::E)])),
        ("a", f64s(vec![Some(2.0), Some(3.0), Some(4.0)])),
        ("g", labels(vec![Some("lo"), Some("hi"), Some("lo")])),
    ]);
    let eval = evaluate(&bound, &batch).unwrap();

    let x = eval.x(CategoricalEncoding::OneHot);
    assert_eq!(x.names(), &["log(age)", "a", "g_lo", "g_hi"]);
    assert_same(x.row(1).unwrap(), &[f64::NAN, 3.0, 0.0, 1.0]);
    assert_same(&column_values(&x, "log(age)"), &[0.0, f64::NAN, 1.0]);
    assert_same(&column_values(&x, "a"), &[2.0, 3.0, 4.0]);

    let frame = eval.frame().unwrap();
    let log_age = frame
        .column_by_name("log(age)")
        .unwrap()
        .as_primitive::<Float64Type>();
    assert_same(log_age.values(), &[0.0, f64::NAN, 1.0]);
    let y = frame.column_by_name("y").unwrap().as_primitive::<Float64Type>();
    assert!(y.is_valid(1));
    assert_eq!(y.value(1), 2.0);
    let a = frame.column_by_name("a").unwrap().as_primitive::<Float64Type>();
    assert!(a.is_valid(1));
    assert_eq!(a.value(1), 3.0);
    let g = frame.column_by_name("g").unwrap().as_dictionary::<Int32Type>();
    assert!(g.keys().is_valid(1));
    assert_eq!(g.keys().value(1), 1);
}

#[test]
fn re_added_response_is_a_predictor_column() {
    let schema = Schema::new(vec![
        FieldDef::new("y", DataTypeDef::F64),
        FieldDef::new("a", DataTypeDef::F64),
    ])
    .unwrap();
    let bound = bind("y ~ a + y - y + y", &schema);
    let batch = make_batch(vec![
        ("y", f64s(vec![Some(1.0), Some(2.0)])),
        ("a", f64s(vec![Some(5.0), Some(6.0)])),
    ]);
    let eval = evaluate(&bound, &batch).unwrap();

    let x = eval.x(CategoricalEncoding::Dummy);
    assert_eq!(x.names(), &["a", "y"]);
    assert_same(&column_values(&x, "y"), &[1.0, 2.0]);

    let frame = eval.frame().unwrap();
    let names: Vec<&str> = frame
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(names, vec!["y", "a"]);
}

#[test]
fn numeric_response_keeps_its_arrow_type() {
    let schema = Schema::new(vec![
        FieldDef::new("count", DataTypeDef::I64),
        FieldDef::new("flag", DataTypeDef::Bool),
    ])
    .unwrap();
    let bound = bind("count ~ flag", &schema);
    let batch = make_batch(vec![
        (
            "count",
            Arc::new(Int64Array::from(vec![Some(3), None])) as ArrayRef,
        ),
        (
            "flag",
            Arc::new(BooleanArray::from(vec![Some(true), Some(false)])) as ArrayRef,
        ),
    ]);
    let eval = evaluate(&bound, &batch).unwrap();

    let y = eval.y().unwrap();
    assert_eq!(y.data_type(), &DataType::Int64);
    assert!(y.is_null(1));
    assert_same(&column_values(&eval.x(CategoricalEncoding::Dummy), "flag"), &[1.0, 0.0]);
}

#[test]
fn one_sided_formula_has_no_response() {
    let bound = bind("~ a", &groups_schema());
    let batch = groups_batch();
    let eval = evaluate(&bound, &batch).unwrap();
    assert!(matches!(eval.y(), Err(EvalError::NoResponse)));
}

#[test]
fn intercept_is_the_first_design_column() {
    let bound = bind("y ~ a + 1", &groups_schema());
    let batch = groups_batch();
    let x = evaluate(&bound, &batch).unwrap().x(CategoricalEncoding::Dummy);
    assert_eq!(x.names(), &[INTERCEPT_COLUMN, "a"]);
    assert_same(&column_values(&x, INTERCEPT_COLUMN), &[1.0; 4]);
}

#[test]
fn empty_design_keeps_row_count() {
    let bound = bind("y ~ 0", &groups_schema());
    let batch = groups_batch();
    let eval = evaluate(&bound, &batch).unwrap();
    let x = eval.x(CategoricalEncoding::Dummy);
    assert_eq!((x.nrows(), x.ncols()), (4, 0));
    assert_eq!(eval.frame().unwrap().num_columns(), 1);
}

#[test]
fn interactions_multiply_operands() {
    let bound = bind("y ~ a::y + g::a", &groups_schema());
    let batch = groups_batch();
    let x = evaluate(&bound, &batch).unwrap().x(CategoricalEncoding::Dummy);
    assert_eq!(x.names(), &["a::y", "g_lo::a", "g_mid::a", "g_hi::a"]);
    let nan = f64::NAN;
    assert_same(&column_values(&x, "a::y"), &[2.0, 6.0, nan, 20.0]);
    assert_same(&column_values(&x, "g_lo::a"), &[2.0, 0.0, nan, nan]);
    assert_same(&column_values(&x, "g_hi::a"), &[0.0, 3.0, nan, nan]);
}

#[test]
fn frame_materializes_the_output_schema() {
    let bound = bind("y ~ g + log(a) + g::a", &groups_schema());
    let batch = groups_batch();
    let frame = evaluate(&bound, &batch).unwrap().frame().unwrap();

    let names: Vec<&str> = frame
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    assert_eq!(
        names,
        vec!["y", "g", "log(a)", "g_lo::a", "g_mid::a", "g_hi::a"]
    );
    assert_eq!(frame.num_rows(), 4);
    assert!(Arc::ptr_eq(frame.column(0), batch.column(0)));

    let g = frame.column(1).as_dictionary::<Int32Type>();
    assert_eq!(
        g.keys().iter().collect::<Vec<_>>(),
        vec![Some(0), Some(2), Some(1), None]
    );
    let levels: Vec<&str> = g.values().as_string::<i32>().iter().flatten().collect();
    assert_eq!(levels, vec!["lo", "mid", "hi"]);

    assert_eq!(frame.column(2).data_type(), &DataType::Float64);
    assert_eq!(
        frame.schema_ref().field(1).data_type(),
        &DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
    );
}

#[test]
fn incompatible_batches_are_rejected() {
    let bound = bind("y ~ a", &groups_schema());

    let wrong_type = make_batch(vec![
        ("y", f64s(vec![Some(1.0)])),
        ("a", Arc::new(Int64Array::from(vec![1])) as ArrayRef),
    ]);
    match evaluate(&bound, &wrong_type) {
        Err(EvalError::SchemaMismatch {
            column,
            expected,
            found,
        }) => {
            assert_eq!(column, "a");
            assert_eq!(expected, "Float64");
            assert_eq!(found, "Int64");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected a schema mismatch"),
    }

    let missing = make_batch(vec![("y", f64s(vec![Some(1.0)]))]);
    assert!(matches!(
        evaluate(&bound, &missing),
        Err(EvalError::SchemaMismatch { .. })
    ));

    // `g` is not read by the plan, so its absence is fine.
    let unused_absent = make_batch(vec![
        ("y", f64s(vec![Some(1.0)])),
        ("a", f64s(vec![Some(1.0)])),
    ]);
    assert!(evaluate(&bound, &unused_absent).is_ok());
}

#[test]
fn one_binding_evaluates_many_batches() {
    let bound = bind("y ~ a + g", &groups_schema());
    let first = groups_batch();
    let second = make_batch(vec![
        ("y", f64s(vec![Some(9.0)])),
        ("a", f64s(vec![Some(8.0)])),
        ("g", labels(vec![Some("mid")])),
    ]);

    let x1 = evaluate(&bound, &first).unwrap().x(CategoricalEncoding::OneHot);
    let x2 = evaluate(&bound, &second).unwrap().x(CategoricalEncoding::OneHot);
    assert_eq!(x1.names(), x2.names());
    assert_eq!(x1.nrows(), 4);
    assert_eq!(x2.row(0).unwrap(), &[8.0, 0.0, 1.0, 0.0]);
}

#[test]
fn evaluation_matches_row_by_row_results() {
    let n = 2_000;
    let a: Vec<Option<f64>> = (0..n)
        .map(|i| if i % 97 == 0 { None } else { Some(i as f64 / 7.0) })
        .collect();
    let g: Vec<Option<&str>> = (0..n).map(|i| Some(["lo", "mid", "hi"][i % 3])).collect();
    let y: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
    let batch = make_batch(vec![("y", f64s(y)), ("a", f64s(a)), ("g", labels(g))]);
    let bound = bind("y ~ 1 + log1p(a) + g::a + g", &groups_schema());

    let whole = evaluate(&bound, &batch).unwrap().x(CategoricalEncoding::Dummy);
    for (row, values) in whole.rows().enumerate().step_by(37) {
        let single = evaluate(&bound, &batch.slice(row, 1))
            .unwrap()
            .x(CategoricalEncoding::Dummy);
        assert_same(values, single.row(0).unwrap());
    }

    let again = evaluate(&bound, &batch).unwrap().x(CategoricalEncoding::Dummy);
    let bits = |m: &DesignMatrix| m.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&whole), bits(&again));
}

#[test]
fn schema_derived_from_a_batch_binds_and_evaluates() {
    let batch = iris_batch();
    let schema = schema_from_record_batch(&batch).unwrap();
    assert_eq!(schema.field("class").unwrap().data_type, DataTypeDef::String);
    // Plain string columns cannot be used without declared levels.
    assert!(Formula::lhs("class").bind(&schema).is_err());

    let bound = bind("petalwidth ~ sepallength::sepalwidth", &schema);
    let eval = evaluate(&bound, &batch).unwrap();
    assert_same(
        &column_values(&eval.x(CategoricalEncoding::Dummy), "sepallength::sepalwidth"),
        &[5.1 * 3.5, 7.0 * 3.2, 6.3 * 3.3],
    );
}
