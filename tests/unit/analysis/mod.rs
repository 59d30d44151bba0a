mod entropy;
mod fourier;
mod wavelet;
