use rand::RngCore;

use crate::Ray;

/// Anything that emits the initial population of a [`Scene`](crate::Scene).
///
/// Sources are polled once, when the scene is initialized. Each one is handed it's own
/// random number generator, derived from the scene's seed.
pub trait RaySource {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray>;
}

#[impl_trait_for_tuples::impl_for_tuples(1, 16)]
impl RaySource for Tuple {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        let mut rays = Vec::new();
        for_tuples!( #( rays.extend(Tuple.generate_rays(rng)); )* );
        rays
    }
}

impl<T: RaySource + ?Sized> RaySource for Box<T> {
    #[inline]
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        self.as_mut().generate_rays(rng)
    }
}

impl<T: RaySource> RaySource for Vec<T> {
    fn generate_rays(&mut self, rng: &mut dyn RngCore) -> Vec<Ray> {
        self.iter_mut()
            .flat_map(|source| source.generate_rays(rng))
            .collect()
    }
}

/// A single, fixed ray.
impl RaySource for Ray {
    #[inline]
    fn generate_rays(&mut self, _rng: &mut dyn RngCore) -> Vec<Ray> {
        vec![self.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fan(usize);

    impl RaySource for Fan {
        fn generate_rays(&mut self, _rng: &mut dyn RngCore) -> Vec<Ray> {
            (0..self.0).map(|i| Ray::new([i as f64, 0.0], [0.0, 1.0])).collect()
        }
    }

    #[test]
    fn sources_compose() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        assert_eq!((Fan(2), Fan(3)).generate_rays(&mut rng).len(), 5);
        assert_eq!(vec![Fan(1), Fan(4)].generate_rays(&mut rng).len(), 5);

        let mut boxed: Box<dyn RaySource> = Box::new((Fan(1), vec![Fan(2)]));
        assert_eq!(boxed.generate_rays(&mut rng).len(), 3);

        let mut fixed = vec![Ray::new([0.0, 0.0], [1.0, 0.0]); 2];
        assert_eq!(fixed.generate_rays(&mut rng).len(), 2);
    }
}
