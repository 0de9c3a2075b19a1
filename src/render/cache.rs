use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::geometry::Polyline;
use crate::math::Point2;
use crate::transform::AffineTransform;

use super::decimate::decimate;

/// A cached array together with the transform it was built for.
#[derive(Debug)]
struct Cached {
    transform: AffineTransform,
    array: Arc<[f32]>,
}

#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Empty,
    /// At least one [`RenderArray`] is checked out.
    Strong(Cached),
    /// Nothing is checked out; [`RenderingCache::evict`] may drop the array.
    Evictable(Cached),
}

/// Per-polyline cache of a decimated, device-space coordinate array.
///
/// Arrays are interleaved `x, y` pairs. A checkout with the cached transform
/// is free; a checkout with a different transform while nothing else holds
/// the array re-maps it in place through the delta transform; otherwise a
/// fresh, uncached array is built from the source geometry.
///
/// The lock count is updated while holding the state mutex, so readers of
/// [`lock_count`](Self::lock_count) see a value consistent with the state.
#[derive(Default)]
pub struct RenderingCache {
    state: Mutex<CacheState>,
    locks: AtomicUsize,
}

impl fmt::Debug for RenderingCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderingCache")
            .field("locks", &self.lock_count())
            .finish_non_exhaustive()
    }
}

impl RenderingCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached arrays currently checked out.
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.load(Ordering::Acquire)
    }

    /// Returns `true` if an array is cached and nothing has it checked out.
    #[must_use]
    pub fn is_evictable(&self) -> bool {
        matches!(*self.lock_state(), CacheState::Evictable(_))
    }

    /// Checks out the array for `source` under `transform`.
    ///
    /// Only a checkout under the cached transform, or a fresh build, is
    /// bit-identical to a cold build. An array re-mapped through a delta
    /// transform carries the `f32` rounding of its previous transform.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the array has to be rebuilt and a source
    /// point cannot be brought into the target frame.
    pub fn checkout(&self, source: &Polyline, transform: &AffineTransform) -> Result<RenderArray<'_>> {
        let mut state = self.lock_state();
        let cached = match std::mem::take(&mut *state) {
            CacheState::Empty => None,
            CacheState::Strong(c) | CacheState::Evictable(c) => Some(c),
        };

        match cached {
            Some(c) if c.transform == *transform => {
                tracing::debug!("render cache hit");
                let array = Arc::clone(&c.array);
                *state = CacheState::Strong(c);
                self.locks.fetch_add(1, Ordering::AcqRel);
                return Ok(RenderArray::counted(self, array));
            }
            Some(mut c) if self.locks.load(Ordering::Acquire) == 0 => {
                if let Ok(delta) = c.transform.inverted().map(|inv| inv.then(transform)) {
                    tracing::debug!("render cache re-mapped through delta transform");
                    remap(&mut c.array, &delta);
                    c.transform = *transform;
                    let array = Arc::clone(&c.array);
                    *state = CacheState::Strong(c);
                    self.locks.fetch_add(1, Ordering::AcqRel);
                    return Ok(RenderArray::counted(self, array));
                }
                // Singular previous transform: fall through and rebuild.
            }
            Some(c) => {
                // Checked out elsewhere under another transform.
                *state = CacheState::Strong(c);
                drop(state);
                tracing::debug!("render cache busy, building detached array");
                let array = build(source, transform)?;
                return Ok(RenderArray::detached(array));
            }
            None => {}
        }

        tracing::debug!("render cache miss");
        let array = build(source, transform)?;
        *state = CacheState::Strong(Cached {
            transform: *transform,
            array: Arc::clone(&array),
        });
        self.locks.fetch_add(1, Ordering::AcqRel);
        Ok(RenderArray::counted(self, array))
    }

    /// Drops the cached array if it is evictable. Returns `true` if dropped.
    pub fn evict(&self) -> bool {
        let mut state = self.lock_state();
        if matches!(*state, CacheState::Evictable(_)) {
            *state = CacheState::Empty;
            true
        } else {
            false
        }
    }

    /// Forgets the cached array after the source geometry changed.
    pub(crate) fn invalidate(&mut self) {
        *self.state.get_mut().unwrap_or_else(PoisonError::into_inner) = CacheState::Empty;
    }

    fn release(&self) {
        let mut state = self.lock_state();
        if self.locks.fetch_sub(1, Ordering::AcqRel) == 1 {
            if let CacheState::Strong(c) = std::mem::take(&mut *state) {
                *state = CacheState::Evictable(c);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked-out coordinate array. Dropping it releases the checkout.
#[derive(Debug)]
pub struct RenderArray<'a> {
    cache: Option<&'a RenderingCache>,
    data: Arc<[f32]>,
}

impl<'a> RenderArray<'a> {
    fn counted(cache: &'a RenderingCache, data: Arc<[f32]>) -> Self {
        Self {
            cache: Some(cache),
            data,
        }
    }

    fn detached(data: Arc<[f32]>) -> Self {
        Self { cache: None, data }
    }

    /// Number of `(x, y)` pairs in the array.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.data.len() / 2
    }

    /// Returns `true` if this array is the cached one (not a detached copy).
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Releases the checkout explicitly.
    pub fn release(self) {}
}

impl Deref for RenderArray<'_> {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl Drop for RenderArray<'_> {
    fn drop(&mut self) {
        if let Some(cache) = self.cache {
            cache.release();
        }
    }
}

/// Builds the array from source geometry at its rendering resolution.
#[allow(clippy::cast_possible_truncation)]
fn build(source: &Polyline, transform: &AffineTransform) -> Result<Arc<[f32]>> {
    let points = source.target_points()?;
    let kept = decimate(&points, source.rendering_resolution());
    let mut out = Vec::with_capacity(kept.len() * 2);
    for p in &kept {
        let q = transform.apply(p);
        out.push(q.x as f32);
        out.push(q.y as f32);
    }
    Ok(out.into())
}

/// Applies `delta` to every pair of `array`, copying first if it is shared.
#[allow(clippy::cast_possible_truncation)]
fn remap(array: &mut Arc<[f32]>, delta: &AffineTransform) {
    let apply = |buf: &mut [f32]| {
        for pair in buf.chunks_exact_mut(2) {
            let q = delta.apply(&Point2::new(f64::from(pair[0]), f64::from(pair[1])));
            pair[0] = q.x as f32;
            pair[1] = q.y as f32;
        }
    };
    if let Some(buf) = Arc::get_mut(array) {
        apply(buf);
    } else {
        let mut copy = array.to_vec();
        apply(copy.as_mut_slice());
        *array = copy.into();
    }
}
