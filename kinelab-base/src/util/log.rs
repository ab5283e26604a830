//! Log filtering shared by programs that run simulations.

/// Provides the recommended log filter for programs which want to exclude particularly noisy
/// details of the simulation library.
///
/// The guiding principle for this filtering is that at [`log::Level::Debug`] or lower level,
/// there should be no messages produced every integrator substep unless something is wrong.
/// Per-substep messages are still available at [`log::Level::Trace`] when the target is
/// requested explicitly by passing `noisy = true`.
#[allow(clippy::missing_inline_in_public_items)]
pub fn standard_filter(metadata: &log::Metadata<'_>, noisy: bool) -> bool {
    let target = metadata.target();

    if noisy {
        return true;
    }

    !(metadata.level() == log::Level::Trace
        && (target.starts_with("kinelab::physics::ode") // every adaptive substep
            || target.starts_with("kinelab::physics::refine"))) // every bisection iteration
}
