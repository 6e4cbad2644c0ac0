/// Presentation hook supplied by the window layer.
///
/// The GL backend never owns the window or its context; it only asks the
/// surface to present when the application swaps buffers.
pub trait GlSurface {
    fn swap_buffers(&mut self) -> anyhow::Result<()>;
}

impl<F> GlSurface for F
where
    F: FnMut() -> anyhow::Result<()>,
{
    fn swap_buffers(&mut self) -> anyhow::Result<()> {
        self()
    }
}

/// Surface of an offscreen context; presenting does nothing.
#[derive(Debug, Default, Copy, Clone)]
pub struct Headless;

impl GlSurface for Headless {
    fn swap_buffers(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_present() {
        let mut swaps = 0;
        let mut surface = || -> anyhow::Result<()> {
            swaps += 1;
            Ok(())
        };
        surface.swap_buffers().unwrap();
        GlSurface::swap_buffers(&mut surface).unwrap();
        assert_eq!(swaps, 2);
    }

    #[test]
    fn surface_errors_carry_context() {
        use anyhow::Context as _;
        let mut surface = || -> anyhow::Result<()> {
            Err(anyhow::anyhow!("context lost")).context("eglSwapBuffers failed")
        };
        let err = surface.swap_buffers().unwrap_err();
        assert_eq!(format!("{err:#}"), "eglSwapBuffers failed: context lost");
        assert!(Headless.swap_buffers().is_ok());
    }
}
