// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod ids;
pub mod intent;
pub mod model;
pub mod transcript;

pub use ids::*;
pub use intent::*;
pub use model::*;
pub use transcript::*;
