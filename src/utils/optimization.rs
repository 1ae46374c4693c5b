//! Derivative-free minimization for model parameter estimation.
//!
//! Nelder-Mead simplex with optional box bounds. Both ARIMA coefficient
//! estimation and the growth-curve fit go through this entry point.

/// Options controlling the simplex search.
#[derive(Debug, Clone)]
pub struct MinimizeOptions {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Relative size of the initial simplex around the starting point.
    pub initial_step: f64,
}

impl Default for MinimizeOptions {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

/// Outcome of a simplex search.
#[derive(Debug, Clone)]
pub struct MinimizeResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

// Standard Nelder-Mead coefficients.
const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `objective` starting from `initial`, clamping every candidate
/// point into `bounds` when provided.
pub fn minimize<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    opts: MinimizeOptions,
) -> MinimizeResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return MinimizeResult {
            point: vec![],
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let clamp = |point: Vec<f64>| -> Vec<f64> {
        match bounds {
            None => point,
            Some(b) => point
                .into_iter()
                .enumerate()
                .map(|(i, x)| if i < b.len() { x.clamp(b[i].0, b[i].1) } else { x })
                .collect(),
        }
    };

    // Build the initial simplex: the start point plus one perturbed vertex
    // per dimension.
    let mut simplex: Vec<Vec<f64>> = vec![initial.to_vec()];
    for i in 0..n {
        let mut vertex = initial.to_vec();
        let step = if initial[i].abs() > 1e-10 {
            opts.initial_step * initial[i].abs()
        } else {
            opts.initial_step
        };
        vertex[i] += step;
        simplex.push(clamp(vertex));
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < opts.max_iter {
        iterations += 1;

        // Order vertices best -> worst.
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| {
            values[a]
                .partial_cmp(&values[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let best = order[0];
        let worst = order[n];
        let second_worst = order[n - 1];

        if values[worst] - values[best] < opts.tolerance {
            converged = true;
            break;
        }

        // Centroid of all vertices except the worst.
        let mut centroid = vec![0.0; n];
        for (idx, vertex) in simplex.iter().enumerate() {
            if idx != worst {
                for (c, x) in centroid.iter_mut().zip(vertex.iter()) {
                    *c += x;
                }
            }
        }
        for c in &mut centroid {
            *c /= n as f64;
        }

        let toward = |coef: f64, target: &[f64]| -> Vec<f64> {
            clamp(
                centroid
                    .iter()
                    .zip(target.iter())
                    .map(|(c, t)| c + coef * (t - c))
                    .collect(),
            )
        };

        let reflected = toward(-REFLECT, &simplex[worst]);
        let reflected_value = objective(&reflected);

        if reflected_value < values[best] {
            // Try to go further in the same direction.
            let expanded = toward(-REFLECT * EXPAND, &simplex[worst]);
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        // Contract toward the better of (worst, reflected).
        let (target, target_value) = if reflected_value < values[worst] {
            (reflected.clone(), reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = toward(CONTRACT, &target);
        let contracted_value = objective(&contracted);

        if contracted_value < target_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        // Shrink everything toward the best vertex.
        let anchor = simplex[best].clone();
        for (idx, vertex) in simplex.iter_mut().enumerate() {
            if idx != best {
                for (x, a) in vertex.iter_mut().zip(anchor.iter()) {
                    *x = a + SHRINK * (*x - a);
                }
                *vertex = clamp(vertex.clone());
                values[idx] = objective(vertex);
            }
        }
    }

    let best = values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    MinimizeResult {
        point: simplex[best].clone(),
        value: values[best],
        iterations,
        converged,
    }
}
