//! Save a trained net together with the configuration that produced it.
//!
//! A solution is one JSON document holding the training configuration and
//! the net snapshot (layer types, sizes, hyperparameters and weights).

use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::network::{Net, NetSnapshot};
use crate::train::{NetTrain, TrainConfig};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Solution {
    train: TrainConfig,
    net: NetSnapshot,
}

pub fn write_solution(train: &NetTrain, net: &Net) -> Result<String> {
    let solution = Solution {
        train: train.config().clone(),
        net: net.snapshot(),
    };
    Ok(serde_json::to_string_pretty(&solution)?)
}

pub fn read_solution(text: &str) -> Result<(NetTrain, Net)> {
    let solution: Solution = serde_json::from_str(text)?;
    let train = NetTrain::with_config(solution.train)?;
    let net = Net::from_snapshot(solution.net)?;
    Ok((train, net))
}

pub fn save_solution<P: AsRef<Path>>(path: P, train: &NetTrain, net: &Net) -> Result<()> {
    fs::write(path, write_solution(train, net)?)?;
    Ok(())
}

pub fn load_solution<P: AsRef<Path>>(path: P) -> Result<(NetTrain, Net)> {
    let text = fs::read_to_string(path)?;
    read_solution(&text)
}
