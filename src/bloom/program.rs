//! Compute program reflection
//!
//! A compute program is a set of named kernels, each with its own thread-group
//! extents. The bloom pass never assumes an extent: it looks each kernel up by
//! name and asks the program for its `@workgroup_size` at dispatch time.
//!
//! [`ShaderProgram`] reflects that information from WGSL source with naga, so
//! a kernel counts as present exactly when wgpu would compile it:
//!
//! ```text
//! @compute @workgroup_size(8, 8, 1)
//! fn BloomDownSample(@builtin(global_invocation_id) id: vec3<u32>) { ... }
//! ```

use rustc_hash::FxHashMap;

use crate::errors::{BloomError, Result};

/// Index of a kernel inside its program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub(crate) u32);

impl KernelId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Read-only view of a compiled (or reflected) compute program.
pub trait ComputeProgram {
    /// Human-readable program name, used in error messages.
    fn label(&self) -> &str;

    /// Resolves a kernel by entry point name.
    fn find_kernel(&self, name: &str) -> Option<KernelId>;

    /// Thread-group extents `(x, y, z)` declared by `kernel`.
    ///
    /// # Panics
    ///
    /// May panic if `kernel` was not resolved by this program's
    /// [`find_kernel`](Self::find_kernel).
    fn thread_group_size(&self, kernel: KernelId) -> [u32; 3];
}

/// Reflected entry point of a compute program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInfo {
    pub entry_point: String,
    pub workgroup_size: [u32; 3],
}

/// Compute program described by its entry points.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    label: String,
    kernels: Vec<KernelInfo>,
    lookup: FxHashMap<String, KernelId>,
}

impl ShaderProgram {
    /// Reflects every `@compute` entry point of a WGSL module.
    pub fn from_wgsl(label: impl Into<String>, source: &str) -> Result<Self> {
        let label = label.into();
        let kernels = reflect_wgsl(source).map_err(|detail| BloomError::ProgramReflection {
            program: label.clone(),
            detail,
        })?;
        Self::from_kernels(label, kernels)
    }

    /// Starts a program from explicitly declared kernels.
    #[must_use]
    pub fn builder(label: impl Into<String>) -> ShaderProgramBuilder {
        ShaderProgramBuilder {
            label: label.into(),
            kernels: Vec::new(),
        }
    }

    fn from_kernels(label: String, kernels: Vec<KernelInfo>) -> Result<Self> {
        let mut lookup = FxHashMap::default();
        for (i, kernel) in kernels.iter().enumerate() {
            if kernel.workgroup_size.contains(&0) {
                return Err(BloomError::ProgramReflection {
                    program: label,
                    detail: format!("kernel `{}` has a zero workgroup extent", kernel.entry_point),
                });
            }
            let id = KernelId(i as u32);
            if lookup.insert(kernel.entry_point.clone(), id).is_some() {
                return Err(BloomError::ProgramReflection {
                    program: label,
                    detail: format!("kernel `{}` declared twice", kernel.entry_point),
                });
            }
        }

        log::debug!(
            "Compute program `{}` exposes {} kernel(s)",
            label,
            kernels.len()
        );

        Ok(Self {
            label,
            kernels,
            lookup,
        })
    }

    #[must_use]
    pub fn kernels(&self) -> &[KernelInfo] {
        &self.kernels
    }

    /// Entry point behind `id`, or `None` if `id` belongs to another program.
    #[must_use]
    pub fn kernel(&self, id: KernelId) -> Option<&KernelInfo> {
        self.kernels.get(id.index())
    }
}

impl ComputeProgram for ShaderProgram {
    fn label(&self) -> &str {
        &self.label
    }

    fn find_kernel(&self, name: &str) -> Option<KernelId> {
        self.lookup.get(name).copied()
    }

    fn thread_group_size(&self, kernel: KernelId) -> [u32; 3] {
        self.kernels[kernel.index()].workgroup_size
    }
}

/// Builder for [`ShaderProgram`].
#[derive(Debug, Clone)]
pub struct ShaderProgramBuilder {
    label: String,
    kernels: Vec<KernelInfo>,
}

impl ShaderProgramBuilder {
    #[must_use]
    pub fn kernel(mut self, entry_point: impl Into<String>, workgroup_size: [u32; 3]) -> Self {
        self.kernels.push(KernelInfo {
            entry_point: entry_point.into(),
            workgroup_size,
        });
        self
    }

    pub fn build(self) -> Result<ShaderProgram> {
        ShaderProgram::from_kernels(self.label, self.kernels)
    }
}

// ============================================================================
// WGSL reflection
// ============================================================================

/// Reads the compute entry points through naga, the front end wgpu compiles
/// the same source with.
fn reflect_wgsl(source: &str) -> std::result::Result<Vec<KernelInfo>, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga::ShaderStage::Compute)
        .map(|ep| {
            if ep.workgroup_size_overrides.is_some() {
                return Err(format!(
                    "kernel `{}`: workgroup size depends on pipeline overrides",
                    ep.name
                ));
            }
            Ok(KernelInfo {
                entry_point: ep.name.clone(),
                workgroup_size: ep.workgroup_size,
            })
        })
        .collect()
}
