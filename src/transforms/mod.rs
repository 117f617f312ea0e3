mod affine;
pub use affine::Affine;
mod identity;
pub use identity::Identity;
mod scale;
pub use scale::Scale;
mod translate;
pub use translate::Translate;
