//! Synthetic applicants for the dashboard's random-applicant key.
//!
//! Draws are seeded so a session can be replayed; every draw satisfies the
//! input contract's ranges.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{
    AGE_OF_CAR_RANGE, AGE_OF_POLICYHOLDER_RANGE, AreaCluster, FuelType, NcapRating,
    POLICY_TENURE_RANGE, POPULATION_DENSITY_RANGE, PolicyInput, Segment, VehicleMake,
};
use crate::error::RiskError;

#[derive(Debug, Clone)]
pub struct ApplicantSampler {
    rng: StdRng,
    holder_age: Normal<f64>,
    car_age: Normal<f64>,
    tenure: Normal<f64>,
}

impl ApplicantSampler {
    pub fn new(seed: u64) -> Result<Self, RiskError> {
        let normal = |mean: f64, sd: f64| {
            Normal::new(mean, sd)
                .map_err(|e| RiskError::Config(format!("Sampling distribution error: {e}")))
        };
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            holder_age: normal(44.0, 12.0)?,
            car_age: normal(3.0, 2.5)?,
            tenure: normal(1.2, 1.0)?,
        })
    }

    pub fn next_input(&mut self) -> PolicyInput {
        let (t_lo, t_hi) = POLICY_TENURE_RANGE;
        let tenure = self.tenure.sample(&mut self.rng).clamp(t_lo, t_hi);

        PolicyInput {
            policy_tenure: (tenure * 100.0).round() / 100.0,
            age_of_car: clamp_round(self.car_age.sample(&mut self.rng), AGE_OF_CAR_RANGE),
            age_of_policyholder: clamp_round(
                self.holder_age.sample(&mut self.rng),
                AGE_OF_POLICYHOLDER_RANGE,
            ),
            area_cluster: pick(&mut self.rng, &AreaCluster::ALL),
            segment: pick(&mut self.rng, &Segment::ALL),
            fuel_type: pick(&mut self.rng, &FuelType::ALL),
            population_density: self
                .rng
                .gen_range(POPULATION_DENSITY_RANGE.0..=POPULATION_DENSITY_RANGE.1),
            make: pick(&mut self.rng, &VehicleMake::ALL),
            ncap_rating: pick(&mut self.rng, &NcapRating::ALL),
        }
    }
}

fn clamp_round(x: f64, (lo, hi): (u32, u32)) -> u32 {
    x.round().clamp(f64::from(lo), f64::from(hi)) as u32
}

fn pick<T: Copy>(rng: &mut StdRng, options: &[T]) -> T {
    options[rng.gen_range(0..options.len())]
}
