//! Retro rendering stages
//!
//! Leaf-first:
//! - `color`: gamma, luma, dither lookup, intensity remap
//! - `projection`: world/eye/clip transform, skinning, grid snap
//! - `tessellation`: distance-driven subdivision with attribute blending
//! - `lighting`: light list accumulation, vertex/fragment/baked modes
//! - `fog`: linear distance fog
//! - `dither`: PS1 ordered dither down to 5 bits per channel
//! - `composite`: YIQ encode, mip chain, bandwidth-limited decode
//! - `sky`: view rays and equirectangular lookup for the sky pass
//! - `material`: which of the above a draw runs
//! - `fragment`: the per-pixel chain tying them together
//!
//! Every stage is a pure function of its inputs. The only ordering
//! constraint across pixels is the composite mip barrier.

pub mod color;
pub mod composite;
pub mod dither;
pub mod fog;
pub mod fragment;
pub mod lighting;
pub mod material;
pub mod projection;
pub mod sky;
pub mod tessellation;

pub use composite::{composite, CompositeSettings, YiqMipChain};
pub use dither::DitherSettings;
pub use fog::FogParams;
pub use fragment::{light_vertex, shade_fragment, Fragment, FrameParams, ALPHA_CUTOFF};
pub use lighting::{accumulate, BakedLight, Light, LightList, LightingMode, LIGHT_CAPACITY};
pub use material::MaterialConfig;
pub use projection::{billboard_matrix, project_vertex, snap_to_grid, ProjectedVertex, Skin, TransformSet};
pub use tessellation::{tessellate, Patch, TessellationParams};
