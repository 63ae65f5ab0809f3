//! Small ARIMA(p, d, q) estimator for short return series.
//!
//! The series is differenced `d` times (d <= 1), ARMA(p, q) coefficients are
//! estimated by conditional sum of squares (CSS) minimised with Nelder-Mead,
//! and the model is scored with the Gaussian conditional log-likelihood.
//! Fits that are non-stationary (Σ|φ| >= 1), non-invertible (Σ|θ| >= 1),
//! non-finite or non-converged are reported as failures so callers can move
//! on to the next candidate.

use crate::errors::ModelFailure;
use crate::models::ArimaOrder;

const MAX_ITER_PER_PARAM: usize = 500;

/// How the optimiser is started. Retrying an order with a different start is
/// how the candidate list gets a second chance at a model that failed to
/// converge the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitStrategy {
    /// All coefficients start at zero with a wide initial simplex.
    ZeroStart,
    /// Coefficients start from the lag-1 autocorrelation with a tight simplex.
    MomentStart,
}

/// A fitted model together with the data it was fitted on.
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    series: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

/// Fit an ARIMA model of the given order to `series`.
pub fn fit(series: &[f64], order: ArimaOrder, strategy: FitStrategy) -> Result<ArimaFit, ModelFailure> {
    let (p, d, q) = (order.ar(), order.diff(), order.ma());

    if d > 1 {
        return Err(ModelFailure::FitFailed(format!(
            "differencing order {} is not supported",
            d
        )));
    }
    if p + q == 0 {
        return Err(ModelFailure::FitFailed("order has no ARMA terms".to_string()));
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ModelFailure::InvalidValue("series contains non-finite values".to_string()));
    }

    let differenced = difference(series, d);
    let k = p + q + 1;
    let n = differenced.len();
    // CSS needs at least one residual per estimated parameter
    if n <= p || n - p < k {
        return Err(ModelFailure::InsufficientData(format!(
            "ARIMA{} needs at least {} observations after differencing, got {}",
            order,
            p + k,
            n
        )));
    }

    let (start, step) = initial_simplex(&differenced, p, q, strategy);
    let objective = |params: &[f64]| css(&differenced, p, q, params).map_or(f64::INFINITY, |(ssr, _)| ssr);

    let optimum = nelder_mead(objective, &start, step, MAX_ITER_PER_PARAM * (p + q), 1e-10);
    if !optimum.converged {
        return Err(ModelFailure::FitFailed(format!("ARIMA{} did not converge", order)));
    }

    let (ssr, residuals) = css(&differenced, p, q, &optimum.point).ok_or_else(|| {
        ModelFailure::FitFailed(format!("ARIMA{} converged outside the admissible region", order))
    })?;

    let m = (n - p) as f64;
    let sigma2 = ssr / m;
    if !sigma2.is_finite() || sigma2 <= 0.0 {
        return Err(ModelFailure::Degenerate(format!(
            "ARIMA{} residual variance is {}",
            order, sigma2
        )));
    }

    let log_likelihood = -0.5 * m * ((2.0 * std::f64::consts::PI).ln() + sigma2.ln() + 1.0);
    let aic = 2.0 * k as f64 - 2.0 * log_likelihood;
    if !aic.is_finite() {
        return Err(ModelFailure::FitFailed(format!("ARIMA{} produced a non-finite AIC", order)));
    }

    Ok(ArimaFit {
        order,
        ar: optimum.point[..p].to_vec(),
        ma: optimum.point[p..].to_vec(),
        sigma2,
        log_likelihood,
        aic,
        series: series.to_vec(),
        differenced,
        residuals,
    })
}

impl ArimaFit {
    /// Forecast `steps` future values on the original (undifferenced) scale.
    pub fn forecast(&self, steps: usize) -> Result<Vec<f64>, ModelFailure> {
        if steps == 0 {
            return Err(ModelFailure::ForecastFailed("forecast horizon is zero".to_string()));
        }

        let p = self.ar.len();
        let q = self.ma.len();
        let mut y = self.differenced.clone();
        let mut e = self.residuals.clone();
        let n = y.len();

        for t in n..n + steps {
            let next = arma_prediction(&y, &e, t, &self.ar, &self.ma, p, q);
            y.push(next);
            e.push(0.0);
        }

        let mut out = y[n..].to_vec();
        if self.order.diff() == 1 {
            let mut level = *self
                .series
                .last()
                .ok_or_else(|| ModelFailure::ForecastFailed("empty series".to_string()))?;
            for value in out.iter_mut() {
                level += *value;
                *value = level;
            }
        }

        if out.iter().any(|v| !v.is_finite()) {
            return Err(ModelFailure::ForecastFailed(format!(
                "ARIMA{} forecast is not finite",
                self.order
            )));
        }

        Ok(out)
    }

    /// In-sample one-step-ahead predictions on the original scale.
    pub fn fitted_values(&self) -> Vec<f64> {
        let p = self.ar.len();
        (p..self.differenced.len())
            .map(|t| {
                let predicted = self.differenced[t] - self.residuals[t];
                if self.order.diff() == 1 {
                    self.series[t] + predicted
                } else {
                    predicted
                }
            })
            .collect()
    }
}

fn difference(series: &[f64], d: usize) -> Vec<f64> {
    if d == 0 {
        return series.to_vec();
    }
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

fn arma_prediction(y: &[f64], e: &[f64], t: usize, ar: &[f64], ma: &[f64], p: usize, q: usize) -> f64 {
    let ar_part: f64 = (0..p)
        .filter(|i| t > *i)
        .map(|i| ar[i] * y[t - 1 - i])
        .sum();
    let ma_part: f64 = (0..q)
        .filter(|j| t > *j)
        .map(|j| ma[j] * e[t - 1 - j])
        .sum();
    ar_part + ma_part
}

/// Conditional sum of squares and residuals for the given coefficients.
///
/// Returns `None` outside the stationary/invertible region.
fn css(y: &[f64], p: usize, q: usize, params: &[f64]) -> Option<(f64, Vec<f64>)> {
    let (ar, ma) = params.split_at(p);
    if ar.iter().map(|c| c.abs()).sum::<f64>() >= 1.0 || ma.iter().map(|c| c.abs()).sum::<f64>() >= 1.0 {
        return None;
    }

    let mut residuals = vec![0.0; y.len()];
    let mut ssr = 0.0;
    for t in p..y.len() {
        let predicted = arma_prediction(y, &residuals, t, ar, ma, p, q);
        let e = y[t] - predicted;
        residuals[t] = e;
        ssr += e * e;
    }

    if ssr.is_finite() {
        Some((ssr, residuals))
    } else {
        None
    }
}

fn lag_one_autocorrelation(y: &[f64]) -> f64 {
    if y.len() < 3 {
        return 0.0;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    let denom: f64 = y.iter().map(|v| (v - mean).powi(2)).sum();
    if denom == 0.0 {
        return 0.0;
    }
    let num: f64 = y.windows(2).map(|w| (w[0] - mean) * (w[1] - mean)).sum();
    num / denom
}

fn initial_simplex(y: &[f64], p: usize, q: usize, strategy: FitStrategy) -> (Vec<f64>, f64) {
    match strategy {
        FitStrategy::ZeroStart => (vec![0.0; p + q], 0.1),
        FitStrategy::MomentStart => {
            let rho = lag_one_autocorrelation(y).clamp(-0.8, 0.8);
            let mut start = Vec::with_capacity(p + q);
            start.extend((0..p).map(|_| 0.5 * rho / p as f64));
            start.extend((0..q).map(|_| rho / q as f64));
            (start, 0.05)
        }
    }
}

struct Optimum {
    point: Vec<f64>,
    converged: bool,
}

fn towards(from: &[f64], to: &[f64], coef: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(a, b)| a + coef * (b - a)).collect()
}

/// Derivative-free Nelder-Mead minimiser.
fn nelder_mead<F>(f: F, start: &[f64], step: f64, max_iter: usize, tol: f64) -> Optimum
where
    F: Fn(&[f64]) -> f64,
{
    let dim = start.len();
    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.to_vec());
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

    for _ in 0..max_iter {
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let best = values[0];
        let worst = values[dim];
        if best.is_finite() && worst.is_finite() {
            let spread = worst - best;
            let size = simplex[1..]
                .iter()
                .map(|v| {
                    v.iter()
                        .zip(&simplex[0])
                        .map(|(a, b)| (a - b).abs())
                        .fold(0.0, f64::max)
                })
                .fold(0.0, f64::max);
            if spread <= tol + 1e-8 * best.abs() || size <= 1e-9 {
                return Optimum {
                    point: simplex[0].clone(),
                    converged: true,
                };
            }
        }

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
            .collect();

        let reflected = towards(&centroid, &simplex[dim], -1.0);
        let f_reflected = f(&reflected);

        if f_reflected < values[0] {
            let expanded = towards(&centroid, &simplex[dim], -2.0);
            let f_expanded = f(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
        } else if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
        } else {
            let contracted = towards(&centroid, &simplex[dim], 0.5);
            let f_contracted = f(&contracted);
            if f_contracted < values[dim] {
                simplex[dim] = contracted;
                values[dim] = f_contracted;
            } else {
                for i in 1..=dim {
                    simplex[i] = towards(&simplex[0], &simplex[i], 0.5);
                    values[i] = f(&simplex[i]);
                }
            }
        }
    }

    let best = (0..=dim)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    Optimum {
        point: simplex[best].clone(),
        converged: false,
    }
}
