pub mod alfen;
pub mod homewizard;
pub mod webhook;
