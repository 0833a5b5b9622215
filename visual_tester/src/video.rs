// OpenCV-backed collaborators: a video file source and highgui windows.
// Frames cross the boundary as packed RGB; OpenCV works in BGR, so every
// crossing goes through `cvt_color`.

use image::GrayImage;
use motion_sentinel::stream::{DisplaySink, FrameSource, InterruptSignal};
use motion_sentinel::{DetectorError, Frame, Result};
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

const ESC_KEY: i32 = 27;
const KEY_WAIT_MS: i32 = 30;

pub struct VideoFileSource {
    cap: VideoCapture,
    frame: Mat,
}

impl VideoFileSource {
    pub fn open(path: &str) -> Result<Self> {
        let open_err = |source: opencv::Error| DetectorError::source_open(path, source);
        let cap = VideoCapture::from_file(path, videoio::CAP_ANY).map_err(open_err)?;
        if !cap.is_opened().map_err(open_err)? {
            return Err(DetectorError::source_open(path, "no backend could open the video"));
        }
        Ok(Self {
            cap,
            frame: Mat::default(),
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let grabbed = self.cap.read(&mut self.frame).map_err(DetectorError::capture)?;
        if !grabbed || self.frame.empty() {
            return Ok(None);
        }

        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(DetectorError::capture)?;
        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let bytes = rgb.data_bytes().map_err(DetectorError::capture)?.to_vec();

        Frame::from_raw(width, height, bytes)
            .map(Some)
            .ok_or_else(|| DetectorError::capture("decoded frame has an unexpected layout"))
    }
}

/// Shows "Original", "Output" and "Contours" windows.
pub struct HighguiDisplay;

impl HighguiDisplay {
    fn to_mat(width: u32, height: u32, bytes: &[u8], typ: i32, code: Option<i32>) -> opencv::Result<Mat> {
        let mut mat = Mat::new_rows_cols_with_default(height as i32, width as i32, typ, Scalar::all(0.0))?;
        mat.data_bytes_mut()?.copy_from_slice(bytes);
        match code {
            Some(code) => {
                let mut converted = Mat::default();
                imgproc::cvt_color(&mat, &mut converted, code, 0)?;
                Ok(converted)
            }
            None => Ok(mat),
        }
    }

    fn show(current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> opencv::Result<()> {
        let (width, height) = current.dimensions();
        let original = Self::to_mat(width, height, current.as_raw(), core::CV_8UC3, Some(imgproc::COLOR_RGB2BGR))?;
        let mask = Self::to_mat(width, height, cleaned_mask.as_raw(), core::CV_8UC1, None)?;
        let contours = Self::to_mat(width, height, annotated.as_raw(), core::CV_8UC3, Some(imgproc::COLOR_RGB2BGR))?;

        highgui::imshow("Original", &original)?;
        highgui::imshow("Output", &mask)?;
        highgui::imshow("Contours", &contours)?;
        Ok(())
    }
}

impl DisplaySink for HighguiDisplay {
    fn present(&mut self, current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> Result<()> {
        Self::show(current, cleaned_mask, annotated).map_err(DetectorError::display)
    }
}

impl Drop for HighguiDisplay {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

/// Pumps the highgui event loop and reports ESC.
pub struct EscKey;

impl InterruptSignal for EscKey {
    fn stop_requested(&mut self) -> bool {
        matches!(highgui::wait_key(KEY_WAIT_MS), Ok(ESC_KEY))
    }
}
