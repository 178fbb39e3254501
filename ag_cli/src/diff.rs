//! Higher-order derivatives of a unary function by repeated backward.

use ag_core::dot::get_dot_graph;
use ag_core::{ops, BackwardOptions, Error, Result, Variable};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

/// Compute the n-th derivative of a unary function and print its graph.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "double_diff")]
pub struct DiffArgs {
    /// Derivative order (at least 1)
    #[arg(long, default_value_t = 1)]
    pub order: usize,

    /// Show data in graph labels and log at debug level
    #[arg(short, long)]
    pub verbose: bool,

    /// Function to differentiate
    #[arg(long, value_enum, default_value_t = UnaryFn::Tanh)]
    pub func: UnaryFn,

    /// Point to evaluate at
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub x: f64,

    /// Exponent used by `--func pow`
    #[arg(long, default_value_t = 3.0, allow_negative_numbers = true)]
    pub power: f64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    Sin,
    Cos,
    Tanh,
    Exp,
    Log,
    Pow,
    Square,
    Neg,
}

impl UnaryFn {
    pub fn apply(self, x: &Variable, power: f64) -> Result<Variable> {
        match self {
            UnaryFn::Sin => ops::sin(x),
            UnaryFn::Cos => ops::cos(x),
            UnaryFn::Tanh => ops::tanh(x),
            UnaryFn::Exp => ops::exp(x),
            UnaryFn::Log => ops::log(x),
            UnaryFn::Pow => ops::pow(x, power),
            UnaryFn::Square => ops::square(x),
            UnaryFn::Neg => ops::neg(x),
        }
    }
}

/// Result of [`nth_derivative`]: the value at `x` and the variable holding
/// it, whose creator graph is the derivative's own computation.
pub struct Derivative {
    pub value: f64,
    pub grad: Variable,
}

/// Differentiate `func` at `x` `order` times.
///
/// Every pass runs with `create_graph` so the gradient is itself
/// differentiable. `x` is cleared before each pass.
/// When a gradient no longer depends on `x` the remaining derivatives are
/// zero.
pub fn nth_derivative(func: UnaryFn, x: &Variable, power: f64, order: usize) -> Result<Derivative> {
    if order == 0 {
        return Err(Error::config("derivative order must be at least 1"));
    }
    let mut root = func.apply(x, power)?;
    root.set_name("y");
    for i in 1..=order {
        x.cleargrad();
        root.backward(BackwardOptions::new().create_graph(true))?;
        let Some(gx) = x.grad() else {
            debug!(order = i, "gradient is constant in x");
            let zero = Variable::constant(0.0).named(format!("gx{order}"));
            return Ok(Derivative {
                value: 0.0,
                grad: zero,
            });
        };
        gx.set_name(format!("gx{i}"));
        debug!(order = i, value = ?gx.data().as_slice(), "derivative");
        root = gx;
    }
    x.cleargrad();
    let value = root.item()?;
    Ok(Derivative { value, grad: root })
}

/// Run the demo: log the derivative and return the DOT text for stdout.
pub fn run(args: &DiffArgs) -> Result<String> {
    let x = Variable::constant(args.x).named("x");
    let d = nth_derivative(args.func, &x, args.power, args.order)?;
    info!(func = ?args.func, x = args.x, order = args.order, value = d.value, "derivative");
    Ok(get_dot_graph(&d.grad, args.verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn derivative(func: UnaryFn, x: f64, order: usize) -> f64 {
        let x = Variable::constant(x);
        nth_derivative(func, &x, 3.0, order).unwrap().value
    }

    #[test]
    fn test_parse_defaults_and_flags() {
        let args = DiffArgs::try_parse_from(["double_diff"]).unwrap();
        assert_eq!(args.order, 1);
        assert_eq!(args.func, UnaryFn::Tanh);

        let args = DiffArgs::try_parse_from([
            "double_diff", "--order", "3", "--func", "sin", "--x", "-0.5", "--verbose",
        ])
        .unwrap();
        assert_eq!(args.order, 3);
        assert_eq!(args.func, UnaryFn::Sin);
        assert_eq!(args.x, -0.5);
        assert!(args.verbose);

        assert!(DiffArgs::try_parse_from(["double_diff", "--func", "gamma"]).is_err());
    }

    #[test]
    fn test_sin_derivatives_cycle() {
        let v = 0.6f64;
        assert_relative_eq!(derivative(UnaryFn::Sin, v, 1), v.cos(), epsilon = 1e-12);
        assert_relative_eq!(derivative(UnaryFn::Sin, v, 2), -v.sin(), epsilon = 1e-12);
        assert_relative_eq!(derivative(UnaryFn::Sin, v, 3), -v.cos(), epsilon = 1e-12);
        assert_relative_eq!(derivative(UnaryFn::Sin, v, 4), v.sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_tanh_second_derivative() {
        let v = 1.0f64;
        let t = v.tanh();
        assert_relative_eq!(derivative(UnaryFn::Tanh, v, 2), -2.0 * t * (1.0 - t * t), epsilon = 1e-12);
    }

    #[test]
    fn test_polynomials_run_out_of_derivatives() {
        assert_relative_eq!(derivative(UnaryFn::Pow, 2.0, 3), 6.0, epsilon = 1e-12);
        assert_eq!(derivative(UnaryFn::Square, 2.0, 3), 0.0);
        assert_eq!(derivative(UnaryFn::Neg, 2.0, 2), 0.0);
        assert_relative_eq!(derivative(UnaryFn::Log, 2.0, 2), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_order_zero_is_config_error() {
        let x = Variable::constant(1.0);
        assert!(matches!(
            nth_derivative(UnaryFn::Exp, &x, 3.0, 0),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_run_emits_dot() {
        let args = DiffArgs::try_parse_from(["double_diff", "--order", "2", "--func", "exp"]).unwrap();
        let dot = run(&args).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("gx2"));
    }
}
