//! Table region selection, rescaling and cropping.

use crate::core::{ExtractResult, PipelineStage};
use crate::domain::{LayoutRegion, Page, TableRegion};
use crate::engines::ensure_batch_len;
use image::imageops;

/// Flattened table regions of a batch plus the number found on each page.
#[derive(Debug, Clone, Default)]
pub struct RegionExtraction {
    /// Regions in page order, then within-page order.
    pub regions: Vec<TableRegion>,
    /// Table count per page, index-aligned with the pages.
    pub table_counts: Vec<usize>,
}

/// Selects table regions from layout output and crops them at high resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableRegionExtractor;

impl TableRegionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts table regions for every page.
    ///
    /// `layouts[i]` must hold the layout regions of `pages[i]`.
    pub fn extract(
        &self,
        pages: &[Page],
        layouts: Vec<Vec<LayoutRegion>>,
    ) -> ExtractResult<RegionExtraction> {
        let layouts = ensure_batch_len(PipelineStage::RegionExtraction, pages.len(), layouts)?;

        let mut extraction = RegionExtraction {
            regions: Vec::new(),
            table_counts: Vec::with_capacity(pages.len()),
        };
        for (position, (page, regions)) in pages.iter().zip(layouts).enumerate() {
            let before = extraction.regions.len();
            for region in regions.into_iter().filter(|r| r.kind.is_table()) {
                extraction
                    .regions
                    .push(Self::crop_region(page, position, &region));
            }
            let count = extraction.regions.len() - before;
            extraction.table_counts.push(count);

            tracing::debug!(
                target: "tables",
                document = %page.page_ref.document,
                page = page.page_ref.page_number(),
                tables = count,
                "Selected table regions"
            );
        }
        Ok(extraction)
    }

    fn crop_region(page: &Page, position: usize, region: &LayoutRegion) -> TableRegion {
        let (width, height) = page.highres_size();
        let highres_bbox = region
            .bbox
            .rescale(page.image_size(), (width, height))
            .clamp(width, height);
        let (x, y, w, h) =
            highres_bbox.pixel_rect(page.highres_image.width(), page.highres_image.height());
        let image = imageops::crop_imm(&page.highres_image, x, y, w, h).to_image();

        tracing::debug!(
            target: "tables",
            page = page.page_ref.page_number(),
            bbox = ?[
                highres_bbox.x_min(),
                highres_bbox.y_min(),
                highres_bbox.x_max(),
                highres_bbox.y_max()
            ],
            crop_size = ?(image.width(), image.height()),
            "Cropped table region"
        );

        TableRegion {
            page: page.page_ref.clone(),
            page_position: position,
            bbox: region.bbox,
            highres_bbox,
            image,
        }
    }
}
