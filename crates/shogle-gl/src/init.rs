use glow::HasContext;

use shogle_core::RenderLimits;

/// Initialization parameters for the GL backend.
///
/// Add flags only for concrete driver or platform requirements.
#[derive(Debug, Clone)]
pub struct GlInit {
    /// Drain `glGetError` after every batch and log what it reports.
    ///
    /// Costs a pipeline sync per batch; meant for debug builds.
    pub debug_checks: bool,

    /// Enable `GL_FRAMEBUFFER_SRGB` so sRGB targets get linear-to-sRGB
    /// conversion on write. Ignored on GLES, where it is always on.
    pub srgb_framebuffer: bool,

    /// Oldest accepted desktop GL version. Separate vertex formats and
    /// storage buffers need 4.3.
    pub min_version: (u32, u32),

    /// Oldest accepted GLES version.
    pub min_es_version: (u32, u32),
}

impl Default for GlInit {
    fn default() -> Self {
        Self {
            debug_checks: cfg!(debug_assertions),
            srgb_framebuffer: true,
            min_version: (4, 3),
            min_es_version: (3, 1),
        }
    }
}

/// Driver identification, logged once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlInfo {
    pub vendor: String,
    pub renderer: String,
    pub version: String,
    pub major: u32,
    pub minor: u32,
    pub embedded: bool,
}

impl GlInfo {
    /// # Safety
    /// `gl` must be current on this thread.
    pub(crate) unsafe fn query(gl: &glow::Context) -> Self {
        // SAFETY: forwarded from the caller.
        unsafe {
            let v = gl.version();
            Self {
                vendor: gl.get_parameter_string(glow::VENDOR),
                renderer: gl.get_parameter_string(glow::RENDERER),
                version: gl.get_parameter_string(glow::VERSION),
                major: v.major,
                minor: v.minor,
                embedded: v.is_embedded,
            }
        }
    }

    pub fn at_least(&self, (major, minor): (u32, u32)) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// Reads device limits, falling back to the core defaults for anything the
/// driver reports as non-positive.
///
/// # Safety
/// `gl` must be current on this thread.
pub(crate) unsafe fn query_limits(gl: &glow::Context) -> RenderLimits {
    let defaults = RenderLimits::default();
    // SAFETY: forwarded from the caller.
    let get = |pname: u32, fallback: u32| {
        let v = unsafe { gl.get_parameter_i32(pname) };
        u32::try_from(v).ok().filter(|&v| v > 0).unwrap_or(fallback)
    };
    RenderLimits {
        max_texture_size: get(glow::MAX_TEXTURE_SIZE, defaults.max_texture_size),
        max_3d_texture_size: get(glow::MAX_3D_TEXTURE_SIZE, defaults.max_3d_texture_size),
        max_array_layers: get(glow::MAX_ARRAY_TEXTURE_LAYERS, defaults.max_array_layers),
        max_vertex_attributes: get(glow::MAX_VERTEX_ATTRIBS, defaults.max_vertex_attributes),
        max_color_attachments: get(glow::MAX_COLOR_ATTACHMENTS, defaults.max_color_attachments),
        max_texture_units: get(
            glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS,
            defaults.max_texture_units,
        ),
        max_uniform_buffer_bindings: get(
            glow::MAX_UNIFORM_BUFFER_BINDINGS,
            defaults.max_uniform_buffer_bindings,
        ),
        max_storage_buffer_bindings: get(
            glow::MAX_SHADER_STORAGE_BUFFER_BINDINGS,
            defaults.max_storage_buffer_bindings,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_comparison_is_lexicographic() {
        let info = GlInfo {
            vendor: String::new(),
            renderer: String::new(),
            version: "4.6.0".to_owned(),
            major: 4,
            minor: 6,
            embedded: false,
        };
        assert!(info.at_least((4, 3)));
        assert!(info.at_least((3, 9)));
        assert!(!info.at_least((5, 0)));
    }

    #[test]
    fn defaults_target_gl_4_3() {
        let init = GlInit::default();
        assert_eq!(init.min_version, (4, 3));
        assert!(init.srgb_framebuffer);
    }
}
