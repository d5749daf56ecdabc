//! Parquet recipe tables, as written by pandas with pyarrow.
//!
//! Every column is turned into the same text/number cells the CSV reader
//! produces, so both formats share one row type. Real list columns are
//! rendered as JSON arrays.

use std::fs::File;
use std::path::Path;

use anyhow::Context;
use arrow::array::{Array, AsArray, GenericListArray, OffsetSizeTrait};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::store::RecipeRow;

pub(super) fn read_rows(path: &Path) -> anyhow::Result<Vec<RecipeRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open recipes table {}", path.display()))?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("{} is not a parquet file", path.display()))?;

    if builder.schema().column_with_name("recipe_id").is_none() {
        anyhow::bail!("recipes table {} has no recipe_id column", path.display());
    }

    let mut rows = Vec::with_capacity(builder.metadata().file_metadata().num_rows().max(0) as usize);
    for batch in builder.build()? {
        let batch = batch.with_context(|| format!("failed to read {}", path.display()))?;
        rows.extend(batch_rows(&batch)?);
    }

    Ok(rows)
}

fn batch_rows(batch: &RecordBatch) -> anyhow::Result<Vec<RecipeRow>> {
    let mut recipe_id = text_cells(batch, "recipe_id")?.into_iter();
    let mut name = text_cells(batch, "name")?.into_iter();
    let mut description = text_cells(batch, "description")?.into_iter();
    let mut recipe_category = text_cells(batch, "recipe_category")?.into_iter();
    let mut keywords = text_cells(batch, "keywords")?.into_iter();
    let mut ingredients = text_cells(batch, "ingredients")?.into_iter();
    let mut recipe_instructions = text_cells(batch, "recipe_instructions")?.into_iter();
    let mut n_ingredients = number_cells(batch, "n_ingredients")?.into_iter();
    let mut total_time_minutes = number_cells(batch, "total_time_minutes")?.into_iter();
    let mut calories = number_cells(batch, "calories")?.into_iter();
    let mut aggregated_rating = number_cells(batch, "aggregated_rating")?.into_iter();
    let mut carbohydrate_content = number_cells(batch, "carbohydrate_content")?.into_iter();
    let mut fat_content = number_cells(batch, "fat_content")?.into_iter();
    let mut protein_content = number_cells(batch, "protein_content")?.into_iter();
    let mut sugar_content = number_cells(batch, "sugar_content")?.into_iter();
    let mut carbohydrate_content_perc = number_cells(batch, "carbohydrate_content_perc")?.into_iter();
    let mut fat_content_perc = number_cells(batch, "fat_content_perc")?.into_iter();
    let mut protein_content_perc = number_cells(batch, "protein_content_perc")?.into_iter();
    let mut sugar_content_perc = number_cells(batch, "sugar_content_perc")?.into_iter();

    let rows = (0..batch.num_rows())
        .map(|_| RecipeRow {
            recipe_id: recipe_id.next().flatten(),
            name: name.next().flatten(),
            description: description.next().flatten(),
            recipe_category: recipe_category.next().flatten(),
            keywords: keywords.next().flatten(),
            ingredients: ingredients.next().flatten(),
            recipe_instructions: recipe_instructions.next().flatten(),
            n_ingredients: n_ingredients.next().flatten(),
            total_time_minutes: total_time_minutes.next().flatten(),
            calories: calories.next().flatten(),
            aggregated_rating: aggregated_rating.next().flatten(),
            carbohydrate_content: carbohydrate_content.next().flatten(),
            fat_content: fat_content.next().flatten(),
            protein_content: protein_content.next().flatten(),
            sugar_content: sugar_content.next().flatten(),
            carbohydrate_content_perc: carbohydrate_content_perc.next().flatten(),
            fat_content_perc: fat_content_perc.next().flatten(),
            protein_content_perc: protein_content_perc.next().flatten(),
            sugar_content_perc: sugar_content_perc.next().flatten(),
        })
        .collect();

    Ok(rows)
}

/// Cells of column `name` as text; all `None` when the column is absent.
fn text_cells(batch: &RecordBatch, name: &str) -> anyhow::Result<Vec<Option<String>>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(vec![None; batch.num_rows()]);
    };

    match column.data_type() {
        DataType::List(_) => list_cells(column.as_list::<i32>()),
        DataType::LargeList(_) => list_cells(column.as_list::<i64>()),
        _ => {
            let strings = cast(column.as_ref(), &DataType::Utf8)
                .with_context(|| format!("column {name} cannot be read as text"))?;

            Ok(strings
                .as_string::<i32>()
                .iter()
                .map(|cell| cell.map(str::to_string))
                .collect())
        }
    }
}

fn list_cells<O: OffsetSizeTrait>(list: &GenericListArray<O>) -> anyhow::Result<Vec<Option<String>>> {
    let mut cells = Vec::with_capacity(list.len());

    for row in 0..list.len() {
        if list.is_null(row) {
            cells.push(None);
            continue;
        }

        let values = list.value(row);
        let items = cast(values.as_ref(), &DataType::Utf8)?;
        let items: Vec<&str> = items.as_string::<i32>().iter().flatten().collect();
        cells.push(Some(serde_json::to_string(&items)?));
    }

    Ok(cells)
}

/// Cells of column `name` as numbers. Values that do not parse become
/// `None`, as in the CSV reader.
fn number_cells(batch: &RecordBatch, name: &str) -> anyhow::Result<Vec<Option<f64>>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(vec![None; batch.num_rows()]);
    };

    let numbers = cast(column.as_ref(), &DataType::Float64)
        .with_context(|| format!("column {name} cannot be read as a number"))?;

    Ok(numbers
        .as_primitive::<Float64Type>()
        .iter()
        .map(|cell| cell.filter(|v| !v.is_nan()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, Int64Array, ListBuilder, StringArray, StringBuilder};
    use parquet::arrow::ArrowWriter;

    use crate::recipes::RecipeStore;

    fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
        let batch = RecordBatch::try_from_iter(columns).unwrap();
        let file = File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    fn string_lists(rows: &[Option<&[&str]>]) -> ArrayRef {
        let mut builder = ListBuilder::new(StringBuilder::new());
        for row in rows {
            match row {
                Some(items) => {
                    for item in *items {
                        builder.values().append_value(item);
                    }
                    builder.append(true);
                }
                None => builder.append(false),
            }
        }
        Arc::new(builder.finish())
    }

    #[test]
    fn test_load_parquet_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master_df.parquet");

        write_parquet(
            &path,
            vec![
                ("recipe_id", Arc::new(Int64Array::from(vec![38, 39])) as ArrayRef),
                (
                    "name",
                    Arc::new(StringArray::from(vec![Some("Berry Dessert"), None])) as ArrayRef,
                ),
                (
                    "keywords",
                    string_lists(&[Some(&["Dessert", "Summer"][..]), None]),
                ),
                (
                    "ingredients",
                    string_lists(&[Some(&["blueberries", "sugar"][..]), Some(&["flour"][..])]),
                ),
                (
                    "recipe_instructions",
                    Arc::new(StringArray::from(vec!["['Toss.', 'Freeze.']", "Bake."])) as ArrayRef,
                ),
                (
                    "calories",
                    Arc::new(Float64Array::from(vec![Some(170.9), None])) as ArrayRef,
                ),
                ("ignored_column", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ],
        );

        let store = RecipeStore::load(&path).unwrap();
        assert_eq!(store.len(), 2);

        let dessert = store.get(38).unwrap();
        assert_eq!(dessert.name.as_deref(), Some("Berry Dessert"));
        assert_eq!(dessert.keywords, vec!["Dessert", "Summer"]);
        assert_eq!(dessert.ingredients, vec!["blueberries", "sugar"]);
        assert_eq!(dessert.n_ingredients, Some(2));
        assert_eq!(dessert.recipe_instructions, vec!["Toss.", "Freeze."]);
        assert_eq!(dessert.calories, Some(170.9));
        assert_eq!(dessert.protein_content, None);

        let other = store.get(39).unwrap();
        assert_eq!(other.name, None);
        assert!(other.keywords.is_empty());
        assert_eq!(other.ingredients, vec!["flour"]);
        assert_eq!(other.calories, None);
    }

    #[test]
    fn test_parquet_float_and_string_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.parquet");

        write_parquet(
            &path,
            vec![(
                "recipe_id",
                Arc::new(Float64Array::from(vec![Some(7.0), Some(2.5), None])) as ArrayRef,
            )],
        );

        let store = RecipeStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains(7));
    }

    #[test]
    fn test_parquet_without_id_column_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.parquet");

        write_parquet(
            &path,
            vec![("name", Arc::new(StringArray::from(vec!["Soup"])) as ArrayRef)],
        );

        assert!(RecipeStore::load(&path).is_err());
    }

    #[test]
    fn test_not_a_parquet_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.parquet");
        std::fs::write(&path, "recipe_id,name\n1,Soup\n").unwrap();

        assert!(RecipeStore::load(&path).is_err());
    }
}
