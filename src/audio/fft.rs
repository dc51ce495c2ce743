use realfft::num_complex::Complex;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Periodic Hann window (the `fftbins=True` variant used for spectral analysis).
pub fn periodic_hann(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos())
        .collect()
}

/// Symmetric Hann window, used for the pitch analysis frames.
pub fn symmetric_hann(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| {
            0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (size as f64 - 1.0)).cos()
        })
        .collect()
}

/// Windowed real FFT producing power spectra.
///
/// Pre-allocates the FFT plan and scratch buffers so each frame reuses them.
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f64>,
    spectrum_buf: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    plan: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
}

impl FftPipeline {
    /// # Panics
    /// Panics if `size` is 0.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f64>::new();
        let plan = planner.plan_fft_forward(size);

        Self {
            fft_size: size,
            input_buf: plan.make_input_vec(),
            spectrum_buf: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
            window: periodic_hann(size),
        }
    }

    /// `|X[k]|^2` for the windowed frame, N/2+1 bins. Short frames are zero padded.
    pub fn power_spectrum(&mut self, frame: &[f64]) -> Vec<f64> {
        let n = self.fft_size.min(frame.len());

        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { frame[i] * self.window[i] } else { 0.0 };
        }

        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            return vec![0.0; self.spectrum_buf.len()];
        }

        self.spectrum_buf.iter().map(|c| c.norm_sqr()).collect()
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn n_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

/// Linear (non-circular) autocorrelation through a zero-padded FFT.
pub struct Autocorrelator {
    frame_len: usize,
    input_buf: Vec<f64>,
    spectrum_buf: Vec<Complex<f64>>,
    output_buf: Vec<f64>,
    forward_scratch: Vec<Complex<f64>>,
    inverse_scratch: Vec<Complex<f64>>,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
}

impl Autocorrelator {
    pub fn new(frame_len: usize) -> Self {
        let padded = (2 * frame_len.max(1)).next_power_of_two();
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(padded);
        let inverse = planner.plan_fft_inverse(padded);

        Self {
            frame_len,
            input_buf: forward.make_input_vec(),
            spectrum_buf: forward.make_output_vec(),
            output_buf: inverse.make_output_vec(),
            forward_scratch: forward.make_scratch_vec(),
            inverse_scratch: inverse.make_scratch_vec(),
            forward,
            inverse,
        }
    }

    /// Returns `r[0..frame_len]`, unnormalised.
    pub fn autocorrelate(&mut self, frame: &[f64]) -> Vec<f64> {
        let n = self.frame_len.min(frame.len());
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n { frame[i] } else { 0.0 };
        }

        if self
            .forward
            .process_with_scratch(
                &mut self.input_buf,
                &mut self.spectrum_buf,
                &mut self.forward_scratch,
            )
            .is_err()
        {
            return vec![0.0; self.frame_len];
        }

        // |X|^2 為實數，虛部歸零讓 inverse plan 接受
        for c in self.spectrum_buf.iter_mut() {
            *c = Complex::new(c.norm_sqr(), 0.0);
        }

        if self
            .inverse
            .process_with_scratch(
                &mut self.spectrum_buf,
                &mut self.output_buf,
                &mut self.inverse_scratch,
            )
            .is_err()
        {
            return vec![0.0; self.frame_len];
        }

        let scale = 1.0 / self.output_buf.len() as f64;
        self.output_buf[..self.frame_len]
            .iter()
            .map(|v| v * scale)
            .collect()
    }
}
