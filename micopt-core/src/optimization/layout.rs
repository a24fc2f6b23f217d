use serde::{Deserialize, Serialize};

use crate::geometry::r2::R2;

/// An ordered set of recorder positions plus the score assigned by whichever
/// solver produced it: GA fitness for genetic runs, mean detection
/// probability for gradient runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorLayout {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub score: f64,
}

impl SensorLayout {
    pub fn from_points(points: &[R2<f64>]) -> SensorLayout {
        SensorLayout {
            xs: points.iter().map(|p| p.x).collect(),
            ys: points.iter().map(|p| p.y).collect(),
            score: 0.,
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<R2<f64>> {
        match (self.xs.get(i), self.ys.get(i)) {
            (Some(&x), Some(&y)) => Some(R2 { x, y }),
            _ => None,
        }
    }

    pub fn set(&mut self, i: usize, p: R2<f64>) {
        self.xs[i] = p.x;
        self.ys[i] = p.y;
    }

    pub fn push(&mut self, p: R2<f64>) {
        self.xs.push(p.x);
        self.ys.push(p.y);
    }

    pub fn points(&self) -> impl Iterator<Item = R2<f64>> + Clone + '_ {
        self.xs.iter().zip(self.ys.iter()).map(|(&x, &y)| R2 { x, y })
    }
}
