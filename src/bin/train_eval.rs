use csv::ReaderBuilder;
use decision_forest::boosting::adaboost::AdaBoost;
use decision_forest::data::dataset::Dataset;
use decision_forest::forests::classifier::DecisionForest;
use decision_forest::metrics::confusion::ClassificationMetrics;
use decision_forest::model::Classifier;
use decision_forest::persistence::Persist;
use decision_forest::trees::classifier::DecisionTree;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::error::Error;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str =
    "usage: train-eval <tree|forest|adaboost> <file.csv> <dimension> [--header] [--save <model.json>]";

struct Options {
    model: String,
    file_path: String,
    dimension: usize,
    header: bool,
    save_path: Option<String>,
}

fn parse_args() -> Result<Options, Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let model = args.next().ok_or(USAGE)?;
    let file_path = args.next().ok_or(USAGE)?;
    let dimension = args.next().ok_or(USAGE)?.parse::<usize>()?;
    let mut options = Options {
        model,
        file_path,
        dimension,
        header: false,
        save_path: None,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--header" => options.header = true,
            "--save" => options.save_path = Some(args.next().ok_or(USAGE)?),
            _ => return Err(USAGE.into()),
        }
    }
    Ok(options)
}

/// Reads `dimension` feature columns followed by a label column. Label strings are mapped to
/// 1, 2, ... in order of first appearance.
fn read_file_classification(
    file_path: &str,
    dimension: usize,
    header: bool,
) -> Result<Dataset<f64>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(header)
        .from_path(file_path)?;
    let mut features = Vec::new();
    let mut labels = Vec::new();
    let mut label_map = HashMap::new();

    for result in reader.records() {
        let record = result?;

        for feature in record.iter().take(dimension) {
            features.push(feature.parse::<f64>()?);
        }

        let label = record.get(dimension).ok_or("Missing label")?;
        let next_id = label_map.len() + 1;
        let label_id = *label_map.entry(label.to_string()).or_insert(next_id);
        labels.push(label_id);
    }
    let feature_matrix = DMatrix::from_row_slice(labels.len(), dimension, &features);
    let label_vector = DVector::from_vec(labels);

    Ok(Dataset::new(feature_matrix, label_vector)?)
}

fn evaluate<M>(model: &M, test_dataset: &Dataset<f64>) -> Result<(), Box<dyn Error>>
where
    M: Classifier<f64> + ClassificationMetrics,
{
    let predictions = model.predict(test_dataset.x())?;
    let accuracy = model.accuracy(test_dataset.y(), &predictions)?;
    let confusion = model.confusion_matrix(test_dataset.y(), &predictions)?;
    println!("Accuracy: {}%", accuracy * 100.0);
    println!("Confusion matrix:{}", confusion);
    Ok(())
}

fn run(options: &Options) -> Result<(), Box<dyn Error>> {
    let dataset = read_file_classification(&options.file_path, options.dimension, options.header)?;
    info!(
        samples = dataset.nrows(),
        labels = dataset.num_labels(),
        "loaded dataset"
    );
    let (train_dataset, test_dataset) = dataset.train_test_split(0.75, None)?;

    match options.model.as_str() {
        "tree" => {
            let mut tree = DecisionTree::with_params(Some(5), Some(100), None)?;
            tree.fit(&train_dataset, None)?;
            evaluate(&tree, &test_dataset)?;
            if let Some(path) = &options.save_path {
                tree.save(path)?;
            }
        }
        "forest" => {
            let mut forest = DecisionForest::with_params(Some(10), Some(5), Some(100))?;
            forest.fit(&train_dataset, None)?;
            evaluate(&forest, &test_dataset)?;
            if let Some(path) = &options.save_path {
                forest.save(path)?;
            }
        }
        "adaboost" => {
            let mut model = AdaBoost::with_params(Some(10), Some(5), Some(100))?;
            model.fit(&train_dataset, None)?;
            evaluate(&model, &test_dataset)?;
            if let Some(path) = &options.save_path {
                model.save(path)?;
            }
        }
        _ => return Err(USAGE.into()),
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let result = parse_args().and_then(|options| run(&options));
    if let Err(err) = result {
        eprintln!("{}", err);
        process::exit(1);
    }
}
