//! AdaDelta update rule on candle variables
//!
//! Keeps decaying averages of squared gradients and squared updates per
//! variable, so step sizes adapt without a tuned learning rate. The
//! configured learning rate scales the update; 1.0 gives the plain rule.

use candle_core::backprop::GradStore;
use candle_core::{Result, Var};
use candle_nn::Optimizer;

/// AdaDelta hyperparameters
#[derive(Debug, Clone)]
pub struct ParamsAdaDelta {
    pub lr: f64,
    pub rho: f64,
    pub eps: f64,
}

impl Default for ParamsAdaDelta {
    fn default() -> Self {
        Self {
            lr: 1.0,
            rho: 0.95,
            eps: 1e-6,
        }
    }
}

#[derive(Debug)]
struct VarAdaDelta {
    var: Var,
    sq_grad: Var,
    sq_update: Var,
}

/// AdaDelta optimizer over a fixed set of variables
#[derive(Debug)]
pub struct AdaDelta {
    vars: Vec<VarAdaDelta>,
    params: ParamsAdaDelta,
}

impl Optimizer for AdaDelta {
    type Config = ParamsAdaDelta;

    fn new(vars: Vec<Var>, params: ParamsAdaDelta) -> Result<Self> {
        let vars = vars
            .into_iter()
            .filter(|var| var.dtype().is_float())
            .map(|var| {
                let sq_grad = Var::zeros(var.shape(), var.dtype(), var.device())?;
                let sq_update = Var::zeros(var.shape(), var.dtype(), var.device())?;
                Ok(VarAdaDelta {
                    var,
                    sq_grad,
                    sq_update,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { vars, params })
    }

    fn learning_rate(&self) -> f64 {
        self.params.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.params.lr = lr
    }

    fn step(&mut self, grads: &GradStore) -> Result<()> {
        let ParamsAdaDelta { lr, rho, eps } = self.params;
        for state in &self.vars {
            let Some(g) = grads.get(&state.var) else {
                continue;
            };
            let sq_grad = ((state.sq_grad.as_tensor() * rho)? + (g.sqr()? * (1.0 - rho))?)?;
            let rms_update = (state.sq_update.as_tensor() + eps)?.sqrt()?;
            let rms_grad = (&sq_grad + eps)?.sqrt()?;
            let update = ((rms_update / rms_grad)? * g)?;
            let sq_update =
                ((state.sq_update.as_tensor() * rho)? + (update.sqr()? * (1.0 - rho))?)?;

            state.var.set(&(state.var.as_tensor() - (&update * lr)?)?)?;
            state.sq_grad.set(&sq_grad)?;
            state.sq_update.set(&sq_update)?;
        }
        Ok(())
    }
}
