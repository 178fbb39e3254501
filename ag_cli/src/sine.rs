//! Fit an LSTM to a noisy sine wave with truncated BPTT.

use std::f64::consts::PI;

use ag_core::{no_grad, ops, test_mode, BackwardOptions, Error, RandomSource, Result, StdRandom, Tensor, Variable};
use ag_nn::{shared, Adam, Layer, Linear, Lstm, Model, Optimizer, Parameters, SeqBatches, SharedRandom};
use clap::Parser;
use tracing::{debug, info};

/// Train an LSTM on a noisy sine curve and print a cosine continuation as CSV.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lstm_sine")]
pub struct SineArgs {
    /// Passes over the training curve
    #[arg(long, default_value_t = 100)]
    pub epoch: usize,

    /// Parallel streams per step
    #[arg(long, default_value_t = 30)]
    pub batch_size: usize,

    /// LSTM hidden units
    #[arg(long, default_value_t = 100)]
    pub hidden_size: usize,

    /// Steps between truncations of the graph
    #[arg(long, default_value_t = 30)]
    pub bptt_length: usize,

    /// Samples on the training curve
    #[arg(long, default_value_t = 1000)]
    pub num_points: usize,

    /// Adam step size
    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    /// PRNG seed for data noise and weight init
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    #[arg(short, long)]
    pub verbose: bool,
}

impl SineArgs {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("--epoch", self.epoch),
            ("--batch-size", self.batch_size),
            ("--hidden-size", self.hidden_size),
            ("--bptt-length", self.bptt_length),
        ] {
            if value == 0 {
                return Err(Error::config(format!("{name} must be positive")));
            }
        }
        if self.num_points < self.batch_size + 1 {
            return Err(Error::config(format!(
                "--num-points {} too small for --batch-size {}",
                self.num_points, self.batch_size
            )));
        }
        Ok(())
    }
}

/// `sin` over `[0, 2 pi]` with `U(-0.05, 0.05)` noise, as next-value pairs.
pub fn noisy_sine(num_points: usize, rng: &mut dyn RandomSource) -> (Vec<f64>, Vec<f64>) {
    let ys: Vec<f64> = Tensor::linspace(0.0, 2.0 * PI, num_points)
        .as_slice()
        .iter()
        .map(|x| x.sin() + (rng.uniform() - 0.5) * 0.1)
        .collect();
    let inputs = ys[..num_points - 1].to_vec();
    let targets = ys[1..].to_vec();
    (inputs, targets)
}

/// `Lstm(hidden) -> Linear(1)`.
pub struct SineModel {
    lstm: Lstm,
    head: Linear,
}

impl SineModel {
    pub fn new(hidden_size: usize, rng: SharedRandom) -> Self {
        SineModel {
            lstm: Lstm::new(hidden_size, rng.clone()),
            head: Linear::new(1, rng),
        }
    }
}

impl Layer for SineModel {
    fn forward(&mut self, xs: &[Variable]) -> Result<Vec<Variable>> {
        let h = self.lstm.forward(xs)?;
        self.head.forward(&h)
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.extend_prefixed("lstm", self.lstm.parameters());
        params.extend_prefixed("head", self.head.parameters());
        params
    }

    fn reset_state(&mut self) {
        self.lstm.reset_state();
    }
}

impl Model for SineModel {}

/// Train and return the model together with the mean loss of each epoch.
pub fn train(args: &SineArgs) -> Result<(SineModel, Vec<f64>)> {
    args.validate()?;
    let mut data_rng = StdRandom::seeded(args.seed);
    let (inputs, targets) = noisy_sine(args.num_points, &mut data_rng);
    let mut batches = SeqBatches::new(inputs, targets, args.batch_size)?;
    let seq_len = batches.max_iter();

    let mut model = SineModel::new(args.hidden_size, shared(StdRandom::seeded(args.seed.wrapping_add(1))));
    let mut opt = Adam::new(args.lr);
    let mut history = Vec::with_capacity(args.epoch);

    for epoch in 0..args.epoch {
        model.reset_state();
        batches.reset();
        let mut acc: Option<Variable> = None;
        let mut total = 0.0;

        for (i, (x, t)) in batches.by_ref().enumerate() {
            let count = i + 1;
            let y = model.call(&Variable::new(x))?;
            let loss = ops::mean_squared_error(&y, &Variable::new(t))?;
            total += loss.item()?;
            acc = Some(match acc {
                None => loss,
                Some(sum) => ops::add(&sum, &loss)?,
            });

            if count % args.bptt_length == 0 || count == seq_len {
                if let Some(sum) = acc.take() {
                    model.clear_grads();
                    sum.backward(BackwardOptions::default())?;
                    sum.unchain_backward();
                    opt.update(&model.parameters())?;
                    debug!(epoch, step = count, "truncated backward");
                }
            }
        }

        let mean = total / seq_len as f64;
        info!(epoch = epoch + 1, loss = mean, "epoch finished");
        history.push(mean);
    }
    Ok((model, history))
}

/// Feed `cos` over `[0, 4 pi]` one value at a time and collect `(x, prediction)`.
pub fn predict_cosine(model: &mut SineModel, num_points: usize) -> Result<Vec<(f64, f64)>> {
    let _no_grad = no_grad();
    let _test = test_mode();
    model.reset_state();
    let grid = Tensor::linspace(0.0, 4.0 * PI, num_points);
    grid.as_slice()
        .iter()
        .map(|&x| -> Result<(f64, f64)> {
            let input = Variable::new(Tensor::new([1, 1], vec![x.cos()])?);
            let y = model.call(&input)?;
            Ok((x, y.item()?))
        })
        .collect()
}

/// CSV text with an `x,prediction` header.
pub fn to_csv(rows: &[(f64, f64)]) -> String {
    let mut out = String::from("x,prediction\n");
    for (x, y) in rows {
        out.push_str(&format!("{x},{y}\n"));
    }
    out
}
